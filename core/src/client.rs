use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::error::CoreError;
use crate::query::Query;

pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai/websets/v0";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executor configuration. The credential is injected here once, at
/// construction — nothing in the request path reads the environment.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Authenticated request executor for the Websets API.
///
/// Performs exactly one HTTP call per invocation: fixed base address,
/// `accept: application/json`, `x-api-key` credential, JSON body when
/// present, per-call timeout. Never retries — mutation endpoints have no
/// documented idempotency guarantee.
pub struct WebsetsClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl WebsetsClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub async fn get(&self, path: &str, query: &Query) -> Result<Value, CoreError> {
        self.send(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, CoreError> {
        self.send(Method::POST, path, &Query::new(), Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value, CoreError> {
        self.send(Method::PATCH, path, &Query::new(), Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, CoreError> {
        self.send(Method::DELETE, path, &Query::new(), None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<Value>,
    ) -> Result<Value, CoreError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            path
        ))
        .map_err(|e| CoreError::Transport(format!("invalid API URL/path: {e}")))?;
        if !query.is_empty() {
            let mut qp = url.query_pairs_mut();
            for (key, value) in query.pairs() {
                qp.append_pair(key, value);
            }
        }

        let mut request = self
            .http
            .request(method, url)
            .timeout(self.config.timeout)
            .header("accept", "application/json")
            .header("x-api-key", &self.config.api_key);
        if let Some(body) = body {
            // .json() also sets content-type: application/json.
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CoreError::Transport(format!("failed to read response body: {e}")))?;
        let body = parse_response_body(&bytes);

        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(CoreError::RemoteApi {
                status,
                message: remote_error_message(&body, status),
                body,
            })
        }
    }
}

/// Lenient body decode: JSON when it parses, raw text otherwise, null for an
/// empty body (204-style responses).
fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// The remote error message when the body carries one, else a status-derived
/// fallback. The raw body travels alongside either way.
fn remote_error_message(body: &Value, status: u16) -> String {
    for key in ["error", "message"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            if !message.is_empty() {
                return message.to_string();
            }
        }
    }
    format!("HTTP {status}")
}
