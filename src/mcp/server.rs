//! JSON-RPC dispatcher bound to one Umami client.
//!
//! The same dispatcher serves the stdio transport (one instance per process)
//! and the HTTP transport (one instance per session).

use super::helpers::{rpc_error, rpc_success};
use super::models::{
    parse_message, JsonRpcRequest, JsonRpcResponse, Message, RpcError, LATEST_PROTOCOL_VERSION,
    SERVER_NAME, SERVER_VERSION, SUPPORTED_PROTOCOL_VERSIONS,
};
use super::registry::{CapabilityRegistry, WEBSITES_RESOURCE_URI};
use super::tools::handle_tool_call;
use crate::umami::UmamiClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Routes protocol methods to the catalog or to the Umami client.
#[derive(Debug)]
pub struct McpServer {
    client: UmamiClient,
    registry: Arc<CapabilityRegistry>,
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    arguments: Option<Value>,
}

#[derive(Deserialize)]
struct PromptGetParams {
    name: String,
    #[serde(default)]
    arguments: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct ResourceReadParams {
    uri: String,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|_| RpcError::invalid_params("Invalid params"))
}

/// Echoes the client's protocol revision when supported, else the latest.
pub fn negotiate_protocol_version(params: Option<&Value>) -> &'static str {
    params
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .and_then(|requested| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .copied()
                .find(|supported| *supported == requested)
        })
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

impl McpServer {
    pub fn new(client: UmamiClient, registry: Arc<CapabilityRegistry>) -> Self {
        Self { client, registry }
    }

    pub fn client(&self) -> &UmamiClient {
        &self.client
    }

    /// Handles one raw frame. Returns the serialized response, or `None` for
    /// notifications.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<String> {
        let response = match parse_message(raw) {
            Ok(Message::Request(request)) => self.handle_request(request).await,
            Ok(Message::Notification(notification)) => {
                debug!(method = %notification.method, "Ignoring notification");
                return None;
            }
            Err(err) => rpc_error(Value::Null, err),
        };

        match serde_json::to_string(&response) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                error!(error = %e, "Failed to encode response");
                None
            }
        }
    }

    /// Resolves a request to exactly one result or error.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.unwrap_or(Value::Null);
        debug!(method = %request.method, id = %id, "MCP Call");

        match self.dispatch(&request.method, request.params).await {
            Ok(result) => rpc_success(id, result),
            Err(err) => {
                debug!(code = err.code, message = %err.message, "MCP Call failed");
                rpc_error(id, err)
            }
        }
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.handle_initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.registry.tools_list()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(self.registry.prompts_list()),
            "prompts/get" => self.handle_prompts_get(params),
            "resources/list" => Ok(self.registry.resources_list()),
            "resources/read" => self.handle_resources_read(params).await,
            _ => Err(RpcError::method_not_found()),
        }
    }

    // =========================================================================
    // MCP Method Handlers
    // =========================================================================

    /// Handles `initialize` request (Handshake).
    fn handle_initialize(&self, params: Option<&Value>) -> Value {
        json!({
            "protocolVersion": negotiate_protocol_version(params),
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            },
            "capabilities": {
                "tools": {},
                "prompts": {},
                "resources": {}
            }
        })
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ToolCallParams = parse_params(params)?;

        if self.registry.tool(&params.name).is_none() {
            return Err(RpcError::invalid_params(format!(
                "Unknown tool: {}",
                params.name
            )));
        }

        handle_tool_call(&self.client, &params.name, params.arguments).await
    }

    fn handle_prompts_get(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: PromptGetParams = parse_params(params)?;

        let prompt = self.registry.prompt(&params.name).ok_or_else(|| {
            RpcError::invalid_params(format!("Unknown prompt: {}", params.name))
        })?;

        let text = prompt.render(&params.arguments.unwrap_or_default());

        Ok(json!({
            "description": prompt.description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text }
            }]
        }))
    }

    async fn handle_resources_read(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let params: ResourceReadParams = parse_params(params)?;

        if params.uri != WEBSITES_RESOURCE_URI {
            return Err(RpcError::invalid_params(format!(
                "Unknown resource: {}",
                params.uri
            )));
        }

        let websites = self
            .client
            .get_websites(false)
            .await
            .map_err(|e| RpcError::internal(format!("Failed to get websites: {e}")))?;

        let text = serde_json::to_string(&websites)
            .map_err(|e| RpcError::internal(format!("Failed to marshal websites: {e}")))?;

        Ok(json!({
            "contents": [{
                "uri": WEBSITES_RESOURCE_URI,
                "mimeType": "application/json",
                "text": text
            }]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_for(url: &str) -> McpServer {
        let client = UmamiClient::new(&Config {
            url: url.to_string(),
            username: "admin".to_string(),
            password: "pass".to_string(),
        })
        .unwrap();
        McpServer::new(client, Arc::new(CapabilityRegistry::new()))
    }

    fn offline_server() -> McpServer {
        server_for("http://127.0.0.1:1")
    }

    async fn call(server: &McpServer, raw: Value) -> Value {
        let response = server
            .handle_message(raw.to_string().as_bytes())
            .await
            .expect("request must be answered");
        serde_json::from_str(&response).unwrap()
    }

    fn assert_exclusive(response: &Value) {
        assert!(
            response.get("result").is_some() != response.get("error").is_some(),
            "exactly one of result/error expected: {response}"
        );
    }

    #[tokio::test]
    async fn test_initialize_advertises_capabilities() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"}),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["protocolVersion"], LATEST_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "umami-mcp");
        for capability in ["tools", "prompts", "resources"] {
            assert!(result["capabilities"][capability].is_object());
        }
    }

    #[tokio::test]
    async fn test_initialize_echoes_supported_version() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
                   "params": {"protocolVersion": "2024-11-05"}}),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");

        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 2, "method": "initialize",
                   "params": {"protocolVersion": "1999-01-01"}}),
        )
        .await;
        assert_eq!(response["result"]["protocolVersion"], LATEST_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "unknown"}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], 1);
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let server = offline_server();
        let response = server.handle_message(b"{not json").await.unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert!(response["id"].is_null());

        let response = server.handle_message(b"[1, 2, 3]").await.unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_notifications_are_not_answered() {
        let server = offline_server();
        for raw in [
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "method": "notifications/whatever", "params": {"x": 1}}),
            json!({"jsonrpc": "2.0", "id": null, "method": "tools/list"}),
        ] {
            assert!(server.handle_message(raw.to_string().as_bytes()).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_string_ids_are_echoed() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": "abc", "method": "ping"}),
        )
        .await;
        assert_eq!(response["id"], "abc");
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_call_unknown_tool() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "drop_tables", "arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["message"], "Unknown tool: drop_tables");
    }

    #[tokio::test]
    async fn test_tools_call_malformed_params() {
        let server = offline_server();
        for params in [json!("get_stats"), json!({"arguments": {}}), Value::Null] {
            let response = call(
                &server,
                json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": params}),
            )
            .await;
            assert_eq!(response["error"]["code"], -32602);
        }
    }

    #[tokio::test]
    async fn test_tools_call_never_returns_both() {
        let server = offline_server();
        let calls = [
            ("get_websites", json!({})),
            ("get_stats", json!({"website_id": "w", "start_date": "1", "end_date": "2"})),
            ("get_pageviews", json!({"website_id": "w", "start_date": "1", "end_date": "2"})),
            ("get_metrics", json!({"website_id": "w", "start_date": "1", "end_date": "2", "metric_type": "url"})),
            ("get_active", json!({"website_id": "w"})),
        ];

        for (name, arguments) in calls {
            let response = call(
                &server,
                json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
                       "params": {"name": name, "arguments": arguments}}),
            )
            .await;
            assert_exclusive(&response);
            assert_eq!(response["error"]["code"], -32603, "{name}");
        }
    }

    #[tokio::test]
    async fn test_tools_call_wraps_pretty_json() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/websites/site-1/active"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"x": 1, "y": 5}]"#))
            .mount(&upstream)
            .await;

        let response = call(
            &server_for(&upstream.uri()),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "get_active", "arguments": {"website_id": "site-1"}}}),
        )
        .await;

        let content = &response["result"]["content"][0];
        assert_eq!(content["type"], "text");
        let text = content["text"].as_str().unwrap();
        assert!(text.contains('\n'));
        let points: Value = serde_json::from_str(text).unwrap();
        assert_eq!(points, json!([{"x": "1", "y": 5}]));
    }

    #[tokio::test]
    async fn test_tools_call_upstream_error_is_internal() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/websites/site-1/stats"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&upstream)
            .await;

        let response = call(
            &server_for(&upstream.uri()),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                   "params": {"name": "get_stats",
                              "arguments": {"website_id": "site-1", "start_date": "1", "end_date": "2"}}}),
        )
        .await;

        assert_eq!(response["error"]["code"], -32603);
        let message = response["error"]["message"].as_str().unwrap();
        assert!(message.contains("403"));
        assert!(message.contains("forbidden"));
    }

    #[tokio::test]
    async fn test_prompts_get_defaults_and_overrides() {
        let server = offline_server();

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/get",
                   "params": {"name": "top-pages", "arguments": {}}}),
        )
        .await;
        let message = &response["result"]["messages"][0];
        assert_eq!(message["role"], "user");
        let text = message["content"]["text"].as_str().unwrap();
        assert!(!text.contains("{days}"));
        assert!(!text.contains("{limit}"));
        assert!(text.contains('7'));

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/get",
                   "params": {"name": "top-pages", "arguments": {"days": "14"}}}),
        )
        .await;
        let text = response["result"]["messages"][0]["content"]["text"]
            .as_str()
            .unwrap();
        assert!(text.contains("14"));
        assert!(!text.contains("last 7 days"));
    }

    #[tokio::test]
    async fn test_prompts_get_without_arguments() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/get",
                   "params": {"name": "realtime-check"}}),
        )
        .await;
        assert!(response["result"]["messages"][0]["content"]["text"]
            .as_str()
            .unwrap()
            .contains("get_active"));
    }

    #[tokio::test]
    async fn test_prompts_get_unknown_and_malformed() {
        let server = offline_server();
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "prompts/get", "params": {"name": "nope"}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);

        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/get",
                   "params": {"name": "top-pages", "arguments": {"days": 14}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_listings() {
        let server = offline_server();

        let tools = call(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
        assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 5);

        let prompts = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "prompts/list"})).await;
        assert_eq!(prompts["result"]["prompts"].as_array().unwrap().len(), 4);

        let resources =
            call(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
        let resources = resources["result"]["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["uri"], WEBSITES_RESOURCE_URI);
    }

    #[tokio::test]
    async fn test_resources_read_unknown_uri() {
        let response = call(
            &offline_server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read",
                   "params": {"uri": "umami://secrets"}}),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_resources_read_websites() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/websites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "site-1", "name": "Blog", "domain": "blog.example.com"}]
            })))
            .mount(&upstream)
            .await;

        let response = call(
            &server_for(&upstream.uri()),
            json!({"jsonrpc": "2.0", "id": 1, "method": "resources/read",
                   "params": {"uri": "umami://websites"}}),
        )
        .await;

        let contents = response["result"]["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["mimeType"], "application/json");
        let websites: Value = serde_json::from_str(contents[0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(websites[0]["id"], "site-1");
    }
}
