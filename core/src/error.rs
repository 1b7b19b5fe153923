use serde_json::Value;
use thiserror::Error;

/// Error codes surfaced to tool callers. Stable machine strings, never
/// prose — the tool boundary turns these into uniform failure envelopes.
pub mod codes {
    pub const MISSING_PARAMETER: &str = "missing_parameter";
    pub const EMPTY_BATCH: &str = "empty_batch";
    pub const REMOTE_API_ERROR: &str = "remote_api_error";
    pub const TRANSPORT_ERROR: &str = "transport_error";
}

/// Failure taxonomy of the resource-access layer.
///
/// `MissingParameter` and `EmptyBatch` are rejected before any network call.
/// `RemoteApi` means the service answered with a non-2xx status; `Transport`
/// means no response was received at all. None of these are retried here —
/// the remote API documents no idempotency guarantee for mutations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing value for route parameter ':{0}'")]
    MissingParameter(String),

    #[error("batch operation requires at least one item id")]
    EmptyBatch,

    #[error("remote API error ({status}): {message}")]
    RemoteApi {
        status: u16,
        message: String,
        /// Raw response body, kept verbatim for diagnostics.
        body: Value,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl CoreError {
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::MissingParameter(_) => codes::MISSING_PARAMETER,
            CoreError::EmptyBatch => codes::EMPTY_BATCH,
            CoreError::RemoteApi { .. } => codes::REMOTE_API_ERROR,
            CoreError::Transport(_) => codes::TRANSPORT_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            CoreError::MissingParameter("websetId".into()).code(),
            "missing_parameter"
        );
        assert_eq!(CoreError::EmptyBatch.code(), "empty_batch");
        assert_eq!(
            CoreError::RemoteApi {
                status: 404,
                message: "Webset not found".into(),
                body: json!({"error": "Webset not found"}),
            }
            .code(),
            "remote_api_error"
        );
        assert_eq!(
            CoreError::Transport("connection refused".into()).code(),
            "transport_error"
        );
    }

    #[test]
    fn remote_api_display_includes_status_and_message() {
        let err = CoreError::RemoteApi {
            status: 404,
            message: "Webset not found".into(),
            body: Value::Null,
        };
        assert_eq!(err.to_string(), "remote API error (404): Webset not found");
    }
}
