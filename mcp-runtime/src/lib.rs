//! MCP runtime for the Exa Websets API: framed JSON-RPC over stdio, a tool
//! surface covering websets, items, batch mutations, searches, and
//! enrichments, and uniform success/failure envelopes. Every remote
//! interaction goes through `websets-core`; this crate only validates
//! arguments, dispatches, and shapes results.

use std::time::Duration;

use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use websets_core::batch::MutationKind;
use websets_core::endpoint::{resolve, routes};
use websets_core::project;
use websets_core::{
    BatchCoordinator, BatchMutation, BatchProfile, ClientConfig, CoreError, ItemListFilters, Page,
    PageRequest, Query, VerificationStatus, WebsetsClient,
};

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "exa-websets-mcp";

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the Websets MCP server over stdio
    Serve(McpServeArgs),
}

#[derive(Args, Clone, Debug)]
pub struct McpServeArgs {
    /// Exa API key, sent as the x-api-key header on every call
    #[arg(long, env = "EXA_API_KEY")]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "EXA_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Mutation kinds routed as sequential per-item calls instead of the
    /// remote batch endpoints (comma list of update, delete, verify)
    #[arg(long, env = "EXA_EMULATE_BATCH", value_delimiter = ',')]
    pub emulate_batch: Vec<String>,
}

pub async fn run(base_url: &str, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let config = match build_runtime_config(base_url, &args) {
                Ok(config) => config,
                Err(message) => {
                    let payload = json!({
                        "error": "mcp_config_error",
                        "message": message,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    return 2;
                }
            };
            let mut server = McpServer::new(config);
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
    }
}

fn build_runtime_config(base_url: &str, args: &McpServeArgs) -> Result<McpRuntimeConfig, String> {
    let api_key = args.api_key.clone().unwrap_or_default();
    if api_key.trim().is_empty() {
        return Err("EXA_API_KEY is required (set the environment variable or pass --api-key)"
            .to_string());
    }

    let mut batch_profile = BatchProfile::default();
    for raw in &args.emulate_batch {
        let kind = match raw.trim() {
            "" => continue,
            "update" => MutationKind::Update,
            "delete" => MutationKind::Delete,
            "verify" => MutationKind::Verify,
            other => {
                return Err(format!(
                    "unknown batch mutation kind '{other}' (expected update, delete, verify)"
                ));
            }
        };
        batch_profile.emulate(kind);
    }

    Ok(McpRuntimeConfig {
        base_url: base_url.to_string(),
        api_key,
        timeout: Duration::from_secs(args.timeout_secs),
        batch_profile,
    })
}

#[derive(Clone, Debug)]
pub struct McpRuntimeConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub batch_profile: BatchProfile,
}

struct McpServer {
    config: McpRuntimeConfig,
    client: WebsetsClient,
    session_id: String,
}

impl McpServer {
    fn new(config: McpRuntimeConfig) -> Self {
        let client = WebsetsClient::new(ClientConfig {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        });
        Self {
            config,
            client,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    async fn serve_stdio(&mut self) -> Result<(), String> {
        self.emit_startup_status();

        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = io::stdout();

        loop {
            let incoming = read_framed_json(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(incoming) = incoming else {
                break;
            };

            let responses = self.handle_incoming_message(incoming).await;
            for response in responses {
                write_framed_json(&mut stdout, &response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        Ok(())
    }

    // Stdout carries protocol frames; operational status goes to stderr as
    // structured JSON lines.
    fn emit_startup_status(&self) {
        let payload = json!({
            "event": "mcp_startup",
            "server": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "session": self.session_id,
            "base_url": self.config.base_url,
            "batch_profile": {
                "update": self.config.batch_profile.update.as_str(),
                "delete": self.config.batch_profile.delete.as_str(),
                "verify": self.config.batch_profile.verify.as_str(),
            },
            "started_at": chrono::Utc::now(),
        });
        eprintln!("{}", to_pretty_json(&payload));
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // Most likely a client response; this server issues no outbound requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            self.handle_notification(method, params).await;
            None
        }
    }

    async fn handle_notification(&self, method: &str, _params: Value) {
        if matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            return;
        }
        // Unknown notifications are intentionally ignored.
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "prompts": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Tools operate on Exa Websets: managed collections of discovered web items. Start from list_websets_exa or get_webset_exa, page through items with list_webset_items_exa (cursor/limit), and use the batch_* tools to apply one mutation to many items at once. Listing results carry hasMore and nextCursor; pass nextCursor back unchanged to fetch the following page."
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = tool_definitions()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        // Every tool failure becomes a uniform envelope with an explicit
        // failure flag; the transport never sees an unhandled fault.
        let result = self.execute_tool(name, &args).await;
        Ok(match result {
            Ok(payload) => {
                let envelope = json!({
                    "success": true,
                    "tool": name,
                    "data": payload,
                });
                build_tool_call_response(envelope, false)
            }
            Err(err) => {
                let mut envelope = err.to_value();
                envelope["success"] = json!(false);
                envelope["tool"] = json!(name);
                build_tool_call_response(envelope, true)
            }
        })
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match tool_name {
            "create_webset_exa" => self.tool_create_webset(args).await,
            "list_websets_exa" => self.tool_list_websets(args).await,
            "get_webset_exa" => self.tool_get_webset(args).await,
            "update_webset_exa" => self.tool_update_webset(args).await,
            "delete_webset_exa" => self.tool_delete_webset(args).await,
            "list_webset_items_exa" => self.tool_list_webset_items(args).await,
            "search_webset_items_exa" => self.tool_search_webset_items(args).await,
            "get_webset_item_exa" => self.tool_get_webset_item(args).await,
            "update_webset_item_exa" => self.tool_update_webset_item(args).await,
            "delete_webset_item_exa" => self.tool_delete_webset_item(args).await,
            "batch_update_items_exa" => self.tool_batch_update_items(args).await,
            "batch_delete_items_exa" => self.tool_batch_delete_items(args).await,
            "batch_verify_items_exa" => self.tool_batch_verify_items(args).await,
            "create_webset_search_exa" => self.tool_create_webset_search(args).await,
            "get_webset_search_exa" => self.tool_get_webset_search(args).await,
            "cancel_webset_search_exa" => self.tool_cancel_webset_search(args).await,
            "create_enrichment_exa" => self.tool_create_enrichment(args).await,
            "get_enrichment_exa" => self.tool_get_enrichment(args).await,
            "delete_enrichment_exa" => self.tool_delete_enrichment(args).await,
            _ => Err(ToolError::new(
                "unknown_tool",
                format!("Unknown tool '{tool_name}'"),
            )),
        }
    }

    // --- Webset management ---

    async fn tool_create_webset(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let search = required_object(args, "search")?;
        let mut body = Map::new();
        body.insert("search".to_string(), Value::Object(search));
        if let Some(enrichments) = args.get("enrichments") {
            if !enrichments.is_null() {
                if !enrichments.is_array() {
                    return Err(ToolError::new(
                        "validation_failed",
                        "'enrichments' must be an array",
                    )
                    .with_field("enrichments"));
                }
                body.insert("enrichments".to_string(), enrichments.clone());
            }
        }
        if let Some(external_id) = arg_optional_string(args, "externalId")? {
            body.insert("externalId".to_string(), json!(external_id));
        }
        if let Some(metadata) = arg_optional_object(args, "metadata")? {
            body.insert("metadata".to_string(), Value::Object(metadata));
        }
        let response = self.client.post(routes::WEBSETS, Value::Object(body)).await?;
        Ok(response)
    }

    async fn tool_list_websets(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let mut query = Query::new();
        page_request_from_args(args)?.apply(&mut query);
        let body = self.client.get(routes::WEBSETS, &query).await?;
        let page = Page::from_response(&body);
        let mut payload = json!({
            "websetCount": page.items.len(),
            "hasMore": page.has_more,
            "websets": page
                .items
                .iter()
                .map(project::webset_summary)
                .collect::<Vec<_>>(),
        });
        if let Some(cursor) = &page.next_cursor {
            payload["nextCursor"] = json!(cursor);
        }
        Ok(payload)
    }

    async fn tool_get_webset(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let path = resolve(routes::WEBSET_BY_ID, &[("websetId", &webset_id)])?;
        let response = self.client.get(&path, &Query::new()).await?;
        Ok(response)
    }

    async fn tool_update_webset(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let mut body = Map::new();
        if let Some(metadata) = arg_optional_object(args, "metadata")? {
            body.insert("metadata".to_string(), Value::Object(metadata));
        }
        if let Some(external_id) = arg_optional_string(args, "externalId")? {
            body.insert("externalId".to_string(), json!(external_id));
        }
        if body.is_empty() {
            return Err(ToolError::new(
                "validation_failed",
                "Provide at least one of 'metadata', 'externalId'",
            ));
        }
        let path = resolve(routes::WEBSET_BY_ID, &[("websetId", &webset_id)])?;
        let response = self.client.patch(&path, Value::Object(body)).await?;
        Ok(response)
    }

    async fn tool_delete_webset(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let path = resolve(routes::WEBSET_BY_ID, &[("websetId", &webset_id)])?;
        let response = self.client.delete(&path).await?;
        Ok(json!({
            "websetId": webset_id,
            "deleted": true,
            "response": response,
        }))
    }

    // --- Items ---

    async fn tool_list_webset_items(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let filters = ItemListFilters {
            item_type: arg_optional_string(args, "type")?,
            verification_status: arg_optional_verification_status(args, "verificationStatus")?,
            has_enriched_data: arg_optional_bool(args, "hasEnrichedData")?,
            created_after: arg_optional_string(args, "createdAfter")?,
            created_before: arg_optional_string(args, "createdBefore")?,
            updated_after: arg_optional_string(args, "updatedAfter")?,
            updated_before: arg_optional_string(args, "updatedBefore")?,
        };
        let mut query = Query::new();
        page_request_from_args(args)?.apply(&mut query);
        filters.apply(&mut query);

        let path = resolve(routes::WEBSET_ITEMS, &[("websetId", &webset_id)])?;
        let body = self.client.get(&path, &query).await?;
        let page = Page::from_response(&body);
        let mut payload = json!({
            "websetId": webset_id,
            "itemCount": page.items.len(),
            "hasMore": page.has_more,
            "items": page.items.iter().map(project::item_summary).collect::<Vec<_>>(),
        });
        if let Some(cursor) = &page.next_cursor {
            payload["nextCursor"] = json!(cursor);
        }
        Ok(payload)
    }

    async fn tool_search_webset_items(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let mut query = Query::new();
        page_request_from_args(args)?.apply(&mut query);
        query.push_opt_str("sourceId", arg_optional_string(args, "sourceId")?.as_deref());

        let path = resolve(routes::WEBSET_ITEMS, &[("websetId", &webset_id)])?;
        let body = self.client.get(&path, &query).await?;
        let page = Page::from_response(&body);
        let mut payload = json!({
            "websetId": webset_id,
            "itemCount": page.items.len(),
            "hasMore": page.has_more,
            "items": page
                .items
                .iter()
                .map(project::item_source_view)
                .collect::<Vec<_>>(),
        });
        if let Some(cursor) = &page.next_cursor {
            payload["nextCursor"] = json!(cursor);
        }
        Ok(payload)
    }

    async fn tool_get_webset_item(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_id = required_string(args, "itemId")?;
        let path = resolve(
            routes::WEBSET_ITEM_BY_ID,
            &[("websetId", &webset_id), ("itemId", &item_id)],
        )?;
        let response = self.client.get(&path, &Query::new()).await?;
        Ok(response)
    }

    async fn tool_update_webset_item(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_id = required_string(args, "itemId")?;

        let mut body = Map::new();
        if let Some(metadata) = arg_optional_object(args, "metadata")? {
            body.insert("metadata".to_string(), Value::Object(metadata));
        }
        if let Some(verification) = arg_optional_object(args, "verification")? {
            body.insert(
                "verification".to_string(),
                verification_from_object(&verification)?,
            );
        }
        if let Some(custom_fields) = arg_optional_object(args, "customFields")? {
            body.insert("customFields".to_string(), Value::Object(custom_fields));
        }
        if body.is_empty() {
            return Err(ToolError::new(
                "validation_failed",
                "Provide at least one of 'metadata', 'verification', 'customFields'",
            ));
        }

        let path = resolve(
            routes::WEBSET_ITEM_BY_ID,
            &[("websetId", &webset_id), ("itemId", &item_id)],
        )?;
        let response = self.client.patch(&path, Value::Object(body)).await?;
        Ok(response)
    }

    async fn tool_delete_webset_item(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_id = required_string(args, "itemId")?;
        let path = resolve(
            routes::WEBSET_ITEM_BY_ID,
            &[("websetId", &webset_id), ("itemId", &item_id)],
        )?;
        let response = self.client.delete(&path).await?;
        Ok(json!({
            "websetId": webset_id,
            "itemId": item_id,
            "deleted": true,
            "response": response,
        }))
    }

    // --- Batch mutations ---

    async fn tool_batch_update_items(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_ids = required_string_array(args, "itemIds")?;
        let updates = required_object(args, "updates")?;
        if updates.is_empty() {
            return Err(
                ToolError::new("validation_failed", "'updates' must not be empty")
                    .with_field("updates"),
            );
        }
        self.apply_batch(
            &webset_id,
            &item_ids,
            BatchMutation::Update(Value::Object(updates)),
            "update",
        )
        .await
    }

    async fn tool_batch_delete_items(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_ids = required_string_array(args, "itemIds")?;
        self.apply_batch(&webset_id, &item_ids, BatchMutation::Delete, "delete")
            .await
    }

    async fn tool_batch_verify_items(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let item_ids = required_string_array(args, "itemIds")?;
        let status = required_verification_status(args, "status")?;
        let reasoning = arg_optional_string(args, "reasoning")?;
        self.apply_batch(
            &webset_id,
            &item_ids,
            BatchMutation::Verify { status, reasoning },
            "verify",
        )
        .await
    }

    async fn apply_batch(
        &self,
        webset_id: &str,
        item_ids: &[String],
        mutation: BatchMutation,
        label: &str,
    ) -> Result<Value, ToolError> {
        let coordinator = BatchCoordinator::new(&self.client, self.config.batch_profile);
        let outcome = coordinator.apply(webset_id, item_ids, &mutation).await?;
        Ok(json!({
            "websetId": webset_id,
            "mutation": label,
            "result": outcome.to_value(),
        }))
    }

    // --- Searches ---

    async fn tool_create_webset_search(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let search_query = required_string(args, "query")?;
        let count = arg_optional_positive_u64(args, "count")?;

        let mut body = Map::new();
        body.insert("query".to_string(), json!(search_query));
        if let Some(count) = count {
            body.insert("count".to_string(), json!(count));
        }

        let path = resolve(routes::WEBSET_SEARCHES, &[("websetId", &webset_id)])?;
        let response = self.client.post(&path, Value::Object(body)).await?;
        Ok(response)
    }

    async fn tool_get_webset_search(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let search_id = required_string(args, "searchId")?;
        let path = resolve(
            routes::WEBSET_SEARCH_BY_ID,
            &[("websetId", &webset_id), ("searchId", &search_id)],
        )?;
        let response = self.client.get(&path, &Query::new()).await?;
        Ok(response)
    }

    async fn tool_cancel_webset_search(
        &self,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let search_id = required_string(args, "searchId")?;
        let path = resolve(
            routes::WEBSET_SEARCH_CANCEL,
            &[("websetId", &webset_id), ("searchId", &search_id)],
        )?;
        let response = self.client.post(&path, json!({})).await?;
        Ok(json!({
            "websetId": webset_id,
            "searchId": search_id,
            "cancelled": true,
            "response": response,
        }))
    }

    // --- Enrichments ---

    async fn tool_create_enrichment(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let description = required_string(args, "description")?;

        let mut body = Map::new();
        body.insert("description".to_string(), json!(description));
        if let Some(format) = arg_optional_string(args, "format")? {
            body.insert("format".to_string(), json!(format));
        }
        if let Some(options) = arg_optional_string_array(args, "options")? {
            body.insert("options".to_string(), json!(options));
        }

        let path = resolve(routes::WEBSET_ENRICHMENTS, &[("websetId", &webset_id)])?;
        let response = self.client.post(&path, Value::Object(body)).await?;
        Ok(response)
    }

    async fn tool_get_enrichment(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let enrichment_id = required_string(args, "enrichmentId")?;
        let path = resolve(
            routes::WEBSET_ENRICHMENT_BY_ID,
            &[("websetId", &webset_id), ("enrichmentId", &enrichment_id)],
        )?;
        let response = self.client.get(&path, &Query::new()).await?;
        Ok(response)
    }

    async fn tool_delete_enrichment(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let webset_id = required_string(args, "websetId")?;
        let enrichment_id = required_string(args, "enrichmentId")?;
        let path = resolve(
            routes::WEBSET_ENRICHMENT_BY_ID,
            &[("websetId", &webset_id), ("enrichmentId", &enrichment_id)],
        )?;
        let response = self.client.delete(&path).await?;
        Ok(json!({
            "websetId": webset_id,
            "enrichmentId": enrichment_id,
            "deleted": true,
            "response": response,
        }))
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ToolError {
    code: String,
    message: String,
    field: Option<String>,
    docs_hint: Option<String>,
    details: Option<Value>,
}

impl ToolError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
            details: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

impl From<CoreError> for ToolError {
    fn from(err: CoreError) -> Self {
        let code = err.code();
        match err {
            CoreError::MissingParameter(name) => {
                ToolError::new(code, format!("Missing value for route parameter ':{name}'"))
                    .with_field(name)
            }
            CoreError::EmptyBatch => {
                ToolError::new(code, "Batch operation requires at least one item id")
                    .with_field("itemIds")
            }
            CoreError::RemoteApi {
                status,
                message,
                body,
            } => ToolError::new(code, format!("Remote API error ({status}): {message}"))
                .with_details(json!({ "status": status, "body": body })),
            CoreError::Transport(message) => ToolError::new(code, message).with_docs_hint(
                "No response was received; check connectivity and EXA_BASE_URL. The call was not retried.",
            ),
        }
    }
}

#[derive(Debug)]
struct ToolDefinition {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

fn webset_id_property() -> Value {
    json!({ "type": "string", "description": "The unique identifier of the Webset" })
}

fn pagination_properties() -> Vec<(&'static str, Value)> {
    vec![
        (
            "cursor",
            json!({ "type": "string", "description": "Pagination cursor from the previous response" }),
        ),
        (
            "limit",
            json!({ "type": "number", "description": "Results per page (remote default 25, max 200)" }),
        ),
    ]
}

fn object_schema(
    properties: Vec<(&'static str, Value)>,
    required: &[&str],
) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert(name.to_string(), schema);
    }
    json!({
        "type": "object",
        "properties": props,
        "required": required,
        "additionalProperties": false
    })
}

fn tool_definitions() -> Vec<ToolDefinition> {
    let verification_enum = json!({
        "type": "string",
        "enum": ["verified", "pending", "failed"],
        "description": "Verification status"
    });

    vec![
        ToolDefinition {
            name: "create_webset_exa",
            description: "Create a new Webset from a search definition. Items are discovered and verified asynchronously by the remote service.",
            input_schema: object_schema(
                vec![
                    (
                        "search",
                        json!({
                            "type": "object",
                            "description": "Search seed, e.g. {\"query\": \"...\", \"count\": 50}",
                            "properties": {
                                "query": { "type": "string" },
                                "count": { "type": "number" }
                            },
                            "required": ["query"]
                        }),
                    ),
                    (
                        "enrichments",
                        json!({ "type": "array", "items": { "type": "object" }, "description": "Enrichment definitions applied to every discovered item" }),
                    ),
                    ("externalId", json!({ "type": "string", "description": "Caller-side identifier for the Webset" })),
                    ("metadata", json!({ "type": "object", "description": "Free-form key/value metadata" })),
                ],
                &["search"],
            ),
        },
        ToolDefinition {
            name: "list_websets_exa",
            description: "List Websets with pagination. Returns summaries with lifecycle status and sub-resource counts.",
            input_schema: object_schema(pagination_properties(), &[]),
        },
        ToolDefinition {
            name: "get_webset_exa",
            description: "Get a Webset including its embedded searches, enrichments, and monitors.",
            input_schema: object_schema(vec![("websetId", webset_id_property())], &["websetId"]),
        },
        ToolDefinition {
            name: "update_webset_exa",
            description: "Update a Webset's metadata or external identifier.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("metadata", json!({ "type": "object", "description": "Metadata to set" })),
                    ("externalId", json!({ "type": "string", "description": "New caller-side identifier" })),
                ],
                &["websetId"],
            ),
        },
        ToolDefinition {
            name: "delete_webset_exa",
            description: "Delete a Webset and all of its items. This cannot be undone.",
            input_schema: object_schema(vec![("websetId", webset_id_property())], &["websetId"]),
        },
        ToolDefinition {
            name: "list_webset_items_exa",
            description: "List items in a Webset with pagination and optional filters. Items include verification status and a derived enrichment flag.",
            input_schema: object_schema(
                {
                    let mut props = vec![("websetId", webset_id_property())];
                    props.extend(pagination_properties());
                    props.extend([
                        ("type", json!({ "type": "string", "description": "Filter by item type" })),
                        ("verificationStatus", verification_enum.clone()),
                        ("hasEnrichedData", json!({ "type": "boolean", "description": "Filter by enrichment status" })),
                        ("createdAfter", json!({ "type": "string", "description": "ISO 8601 lower bound on creation time" })),
                        ("createdBefore", json!({ "type": "string", "description": "ISO 8601 upper bound on creation time" })),
                        ("updatedAfter", json!({ "type": "string", "description": "ISO 8601 lower bound on update time" })),
                        ("updatedBefore", json!({ "type": "string", "description": "ISO 8601 upper bound on update time" })),
                    ]);
                    props
                },
                &["websetId"],
            ),
        },
        ToolDefinition {
            name: "search_webset_items_exa",
            description: "List items in a Webset filtered by source, with provenance and structured result payloads per item.",
            input_schema: object_schema(
                {
                    let mut props = vec![("websetId", webset_id_property())];
                    props.extend(pagination_properties());
                    props.push((
                        "sourceId",
                        json!({ "type": "string", "description": "Filter by originating source (search, import, monitor)" }),
                    ));
                    props
                },
                &["websetId"],
            ),
        },
        ToolDefinition {
            name: "get_webset_item_exa",
            description: "Get one item with full content, verification details, enriched data, and metadata.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemId", json!({ "type": "string", "description": "The unique identifier of the Item" })),
                ],
                &["websetId", "itemId"],
            ),
        },
        ToolDefinition {
            name: "update_webset_item_exa",
            description: "Update one item's metadata, verification status, or custom fields.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemId", json!({ "type": "string", "description": "The unique identifier of the Item" })),
                    ("metadata", json!({ "type": "object", "description": "Metadata to add or update" })),
                    (
                        "verification",
                        json!({
                            "type": "object",
                            "properties": {
                                "status": { "type": "string", "enum": ["verified", "pending", "failed"] },
                                "reasoning": { "type": "string" }
                            },
                            "required": ["status"]
                        }),
                    ),
                    ("customFields", json!({ "type": "object", "description": "Custom fields to update" })),
                ],
                &["websetId", "itemId"],
            ),
        },
        ToolDefinition {
            name: "delete_webset_item_exa",
            description: "Delete one item from a Webset. This permanently removes the item and its data.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemId", json!({ "type": "string", "description": "The unique identifier of the Item to delete" })),
                ],
                &["websetId", "itemId"],
            ),
        },
        ToolDefinition {
            name: "batch_update_items_exa",
            description: "Apply one update to many items at once. Duplicate ids are attempted as given, never deduplicated.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemIds", json!({ "type": "array", "items": { "type": "string" }, "minItems": 1, "description": "Item ids to update" })),
                    (
                        "updates",
                        json!({
                            "type": "object",
                            "description": "Update applied identically to every item",
                            "properties": {
                                "metadata": { "type": "object" },
                                "addTags": { "type": "array", "items": { "type": "string" } },
                                "removeTags": { "type": "array", "items": { "type": "string" } },
                                "customFields": { "type": "object" }
                            }
                        }),
                    ),
                ],
                &["websetId", "itemIds", "updates"],
            ),
        },
        ToolDefinition {
            name: "batch_delete_items_exa",
            description: "Delete many items at once.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemIds", json!({ "type": "array", "items": { "type": "string" }, "minItems": 1, "description": "Item ids to delete" })),
                ],
                &["websetId", "itemIds"],
            ),
        },
        ToolDefinition {
            name: "batch_verify_items_exa",
            description: "Set the verification status for many items at once.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("itemIds", json!({ "type": "array", "items": { "type": "string" }, "minItems": 1, "description": "Item ids to verify" })),
                    ("status", verification_enum),
                    ("reasoning", json!({ "type": "string", "description": "Reasoning recorded with the verification" })),
                ],
                &["websetId", "itemIds", "status"],
            ),
        },
        ToolDefinition {
            name: "create_webset_search_exa",
            description: "Start a new search inside a Webset to discover more items.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("query", json!({ "type": "string", "description": "Search query" })),
                    ("count", json!({ "type": "number", "description": "Target number of results" })),
                ],
                &["websetId", "query"],
            ),
        },
        ToolDefinition {
            name: "get_webset_search_exa",
            description: "Get the status and progress of a Webset search.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("searchId", json!({ "type": "string", "description": "The unique identifier of the Search" })),
                ],
                &["websetId", "searchId"],
            ),
        },
        ToolDefinition {
            name: "cancel_webset_search_exa",
            description: "Cancel a running Webset search.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("searchId", json!({ "type": "string", "description": "The unique identifier of the Search to cancel" })),
                ],
                &["websetId", "searchId"],
            ),
        },
        ToolDefinition {
            name: "create_enrichment_exa",
            description: "Create an enrichment that extracts an additional field for every item in a Webset.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("description", json!({ "type": "string", "description": "What to extract for each item" })),
                    ("format", json!({ "type": "string", "description": "Result format, e.g. text, number, options, email, phone" })),
                    ("options", json!({ "type": "array", "items": { "type": "string" }, "description": "Allowed values when format is 'options'" })),
                ],
                &["websetId", "description"],
            ),
        },
        ToolDefinition {
            name: "get_enrichment_exa",
            description: "Get an enrichment definition and its status.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("enrichmentId", json!({ "type": "string", "description": "The unique identifier of the Enrichment" })),
                ],
                &["websetId", "enrichmentId"],
            ),
        },
        ToolDefinition {
            name: "delete_enrichment_exa",
            description: "Delete an enrichment from a Webset.",
            input_schema: object_schema(
                vec![
                    ("websetId", webset_id_property()),
                    ("enrichmentId", json!({ "type": "string", "description": "The unique identifier of the Enrichment to delete" })),
                ],
                &["websetId", "enrichmentId"],
            ),
        },
    ]
}

// --- Argument extraction ---
// The JSON schemas above are declarative; these helpers are the actual
// validation boundary. Core components trust values that pass them.

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args.get(key).ok_or_else(|| {
        ToolError::new(
            "validation_failed",
            format!("Missing required field '{key}'"),
        )
        .with_field(key)
    })?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => Err(ToolError::new(
            "validation_failed",
            format!("'{key}' must not be empty"),
        )
        .with_field(key)),
        _ => Err(
            ToolError::new("validation_failed", format!("'{key}' must be a string"))
                .with_field(key),
        ),
    }
}

fn arg_optional_string(args: &Map<String, Value>, key: &str) -> Result<Option<String>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(
            ToolError::new("validation_failed", format!("'{key}' must be a string"))
                .with_field(key),
        ),
    }
}

fn arg_optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(v)) => Ok(Some(*v)),
        Some(_) => Err(
            ToolError::new("validation_failed", format!("'{key}' must be a boolean"))
                .with_field(key),
        ),
    }
}

fn arg_optional_positive_u64(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<u64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v > 0 => Ok(Some(v)),
            _ => Err(ToolError::new(
                "validation_failed",
                format!("'{key}' must be a positive integer"),
            )
            .with_field(key)),
        },
        Some(_) => Err(ToolError::new(
            "validation_failed",
            format!("'{key}' must be a positive integer"),
        )
        .with_field(key)),
    }
}

fn required_string_array(args: &Map<String, Value>, key: &str) -> Result<Vec<String>, ToolError> {
    let value = args.get(key).ok_or_else(|| {
        ToolError::new(
            "validation_failed",
            format!("Missing required field '{key}'"),
        )
        .with_field(key)
    })?;
    let items = value.as_array().ok_or_else(|| {
        ToolError::new(
            "validation_failed",
            format!("'{key}' must be an array of strings"),
        )
        .with_field(key)
    })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or_else(|| {
            ToolError::new(
                "validation_failed",
                format!("'{key}' items must be strings"),
            )
            .with_field(key)
        })?;
        out.push(text.to_string());
    }
    Ok(out)
}

fn arg_optional_string_array(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Vec<String>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_string_array(args, key).map(Some),
    }
}

fn required_object(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, ToolError> {
    match args.get(key) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(
            ToolError::new("validation_failed", format!("'{key}' must be an object"))
                .with_field(key),
        ),
        None => Err(ToolError::new(
            "validation_failed",
            format!("Missing required field '{key}'"),
        )
        .with_field(key)),
    }
}

fn arg_optional_object(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<Map<String, Value>>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(_) => Err(
            ToolError::new("validation_failed", format!("'{key}' must be an object"))
                .with_field(key),
        ),
    }
}

fn arg_optional_verification_status(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<VerificationStatus>, ToolError> {
    match arg_optional_string(args, key)? {
        None => Ok(None),
        Some(raw) => VerificationStatus::parse(&raw).map(Some).ok_or_else(|| {
            ToolError::new(
                "validation_failed",
                format!("'{key}' must be one of: verified, pending, failed"),
            )
            .with_field(key)
        }),
    }
}

fn required_verification_status(
    args: &Map<String, Value>,
    key: &str,
) -> Result<VerificationStatus, ToolError> {
    let raw = required_string(args, key)?;
    VerificationStatus::parse(&raw).ok_or_else(|| {
        ToolError::new(
            "validation_failed",
            format!("'{key}' must be one of: verified, pending, failed"),
        )
        .with_field(key)
    })
}

fn page_request_from_args(args: &Map<String, Value>) -> Result<PageRequest, ToolError> {
    Ok(PageRequest {
        cursor: arg_optional_string(args, "cursor")?,
        limit: arg_optional_positive_u64(args, "limit")?,
    })
}

fn verification_from_object(map: &Map<String, Value>) -> Result<Value, ToolError> {
    let raw = map
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ToolError::new(
                "validation_failed",
                "'verification' requires a string field 'status'",
            )
            .with_field("verification")
        })?;
    let status = VerificationStatus::parse(raw).ok_or_else(|| {
        ToolError::new(
            "validation_failed",
            "'verification.status' must be one of: verified, pending, failed",
        )
        .with_field("verification")
    })?;
    let mut out = json!({ "status": status.as_str() });
    if let Some(reasoning) = map.get("reasoning").and_then(Value::as_str) {
        out["reasoning"] = json!(reasoning);
    }
    Ok(out)
}

// --- Responses and framing ---

fn build_tool_call_response(envelope: Value, is_error: bool) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": to_pretty_json(&envelope)
        }],
        "isError": is_error
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

async fn read_framed_json(
    reader: &mut BufReader<tokio::io::Stdin>,
) -> Result<Option<Value>, std::io::Error> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        if line == "\r\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let json: Value = serde_json::from_slice(&payload).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Invalid JSON payload: {e}"),
        )
    })?;
    Ok(Some(json))
}

async fn write_framed_json(
    writer: &mut tokio::io::Stdout,
    value: &Value,
) -> Result<(), std::io::Error> {
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use websets_core::BatchStrategy;

    fn test_server() -> McpServer {
        McpServer::new(McpRuntimeConfig {
            // Port 9 is discard; tools that reach the network fail fast.
            base_url: "http://127.0.0.1:9".to_string(),
            api_key: "test-api-key".to_string(),
            timeout: Duration::from_secs(1),
            batch_profile: BatchProfile::default(),
        })
    }

    fn serve_args(emulate: &[&str]) -> McpServeArgs {
        McpServeArgs {
            api_key: Some("test-api-key".to_string()),
            timeout_secs: 30,
            emulate_batch: emulate.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn runtime_config_requires_an_api_key() {
        let mut args = serve_args(&[]);
        args.api_key = None;
        let err = build_runtime_config("https://api.exa.ai/websets/v0", &args).unwrap_err();
        assert!(err.contains("EXA_API_KEY"));
    }

    #[test]
    fn runtime_config_parses_emulate_batch_kinds() {
        let config =
            build_runtime_config("https://api.exa.ai/websets/v0", &serve_args(&["verify"]))
                .unwrap();
        assert_eq!(config.batch_profile.verify, BatchStrategy::Emulated);
        assert_eq!(config.batch_profile.update, BatchStrategy::Native);
        assert_eq!(config.batch_profile.delete, BatchStrategy::Native);
    }

    #[test]
    fn runtime_config_rejects_unknown_emulate_kind() {
        let err = build_runtime_config("https://api.exa.ai/websets/v0", &serve_args(&["upsert"]))
            .unwrap_err();
        assert!(err.contains("upsert"));
    }

    #[test]
    fn tool_definitions_cover_the_dispatch_table() {
        let expected = [
            "create_webset_exa",
            "list_websets_exa",
            "get_webset_exa",
            "update_webset_exa",
            "delete_webset_exa",
            "list_webset_items_exa",
            "search_webset_items_exa",
            "get_webset_item_exa",
            "update_webset_item_exa",
            "delete_webset_item_exa",
            "batch_update_items_exa",
            "batch_delete_items_exa",
            "batch_verify_items_exa",
            "create_webset_search_exa",
            "get_webset_search_exa",
            "cancel_webset_search_exa",
            "create_enrichment_exa",
            "get_enrichment_exa",
            "delete_enrichment_exa",
        ];
        let definitions = tool_definitions();
        let names: Vec<&str> = definitions.iter().map(|tool| tool.name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn every_tool_schema_is_a_closed_object() {
        for tool in tool_definitions() {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            assert_eq!(
                tool.input_schema["additionalProperties"], false,
                "{}",
                tool.name
            );
            assert!(tool.input_schema["properties"].is_object(), "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_panicked() {
        let server = test_server();
        let err = server
            .execute_tool("drop_webset_exa", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, "unknown_tool");
    }

    #[tokio::test]
    async fn missing_webset_id_fails_before_any_network_call() {
        let server = test_server();
        let err = server
            .execute_tool("get_webset_item_exa", &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.code, "validation_failed");
        assert_eq!(err.field.as_deref(), Some("websetId"));
    }

    #[tokio::test]
    async fn tools_call_failure_becomes_a_flagged_envelope() {
        let server = test_server();
        let response = server
            .handle_tools_call(json!({
                "name": "get_webset_exa",
                "arguments": {}
            }))
            .await
            .unwrap();
        assert_eq!(response["isError"], true);
        let text = response["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["tool"], "get_webset_exa");
        assert_eq!(envelope["error"], "validation_failed");
    }

    #[tokio::test]
    async fn requests_without_jsonrpc_marker_are_rejected() {
        let server = test_server();
        let responses = server
            .handle_incoming_message(json!({"id": 1, "method": "ping"}))
            .await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn notifications_produce_no_response() {
        let server = test_server();
        let responses = server
            .handle_incoming_message(json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            }))
            .await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn batch_requests_are_answered_per_item() {
        let server = test_server();
        let responses = server
            .handle_incoming_message(json!([
                {"jsonrpc": "2.0", "id": 1, "method": "ping"},
                {"jsonrpc": "2.0", "id": 2, "method": "no/such/method"}
            ]))
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn tools_list_matches_definitions() {
        let server = test_server();
        let payload = server
            .handle_request("tools/list", Value::Null)
            .await
            .unwrap();
        let tools = payload["tools"].as_array().unwrap();
        assert_eq!(tools.len(), tool_definitions().len());
        assert!(tools.iter().all(|tool| tool["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn initialize_names_the_server_and_protocol() {
        let server = test_server();
        let payload = server.handle_request("initialize", Value::Null).await.unwrap();
        assert_eq!(payload["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(payload["serverInfo"]["name"], MCP_SERVER_NAME);
        assert!(payload["instructions"].as_str().unwrap().contains("nextCursor"));
    }

    #[test]
    fn core_errors_map_to_stable_tool_codes() {
        let err: ToolError = CoreError::RemoteApi {
            status: 404,
            message: "Webset not found".into(),
            body: json!({"error": "Webset not found"}),
        }
        .into();
        assert_eq!(err.code, "remote_api_error");
        assert!(err.message.contains("404"));
        assert_eq!(err.details.as_ref().unwrap()["status"], 404);

        let err: ToolError = CoreError::EmptyBatch.into();
        assert_eq!(err.code, "empty_batch");
        assert_eq!(err.field.as_deref(), Some("itemIds"));

        let err: ToolError = CoreError::MissingParameter("itemId".into()).into();
        assert_eq!(err.code, "missing_parameter");
        assert_eq!(err.field.as_deref(), Some("itemId"));

        let err: ToolError = CoreError::Transport("connection refused".into()).into();
        assert_eq!(err.code, "transport_error");
        assert!(err.docs_hint.is_some());
    }

    #[test]
    fn limit_must_be_positive_when_present() {
        let mut args = Map::new();
        args.insert("limit".to_string(), json!(0));
        let err = page_request_from_args(&args).unwrap_err();
        assert_eq!(err.code, "validation_failed");

        let mut args = Map::new();
        args.insert("limit".to_string(), json!(3));
        let request = page_request_from_args(&args).unwrap();
        assert_eq!(request.limit, Some(3));
        assert!(request.cursor.is_none());
    }

    #[test]
    fn verification_object_requires_a_known_status() {
        let mut map = Map::new();
        map.insert("status".to_string(), json!("maybe"));
        let err = verification_from_object(&map).unwrap_err();
        assert_eq!(err.code, "validation_failed");

        let mut map = Map::new();
        map.insert("status".to_string(), json!("failed"));
        map.insert("reasoning".to_string(), json!("dead link"));
        let body = verification_from_object(&map).unwrap();
        assert_eq!(body, json!({"status": "failed", "reasoning": "dead link"}));
    }

    #[test]
    fn required_string_array_keeps_duplicates() {
        let mut args = Map::new();
        args.insert("itemIds".to_string(), json!(["item_1", "item_1"]));
        let ids = required_string_array(&args, "itemIds").unwrap();
        assert_eq!(ids, vec!["item_1".to_string(), "item_1".to_string()]);
    }

    #[tokio::test]
    async fn batch_tool_rejects_empty_id_set_without_network() {
        let server = test_server();
        let mut args = Map::new();
        args.insert("websetId".to_string(), json!("ws_01"));
        args.insert("itemIds".to_string(), json!([]));
        let err = server
            .execute_tool("batch_delete_items_exa", &args)
            .await
            .unwrap_err();
        assert_eq!(err.code, "empty_batch");
    }
}
