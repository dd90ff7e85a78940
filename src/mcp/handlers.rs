//! MCP (Model Context Protocol) HTTP route handlers
//!
//! `initialize` creates a session from credentials passed as query parameters;
//! every later request names its session in the `Mcp-Session-Id` header.

use super::helpers::rpc_error;
use super::models::{
    parse_message, JsonRpcRequest, Message, RpcError, LATEST_PROTOCOL_VERSION, MCP_SESSION_HEADER,
    SERVER_NAME, SERVER_VERSION,
};
use crate::config::Config;
use crate::session::SharedState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Path of the single protocol endpoint
pub const MCP_PATH: &str = "/mcp";

/// Creates routes for MCP-related operations
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route(MCP_PATH, post(handle_mcp).delete(handle_delete))
        .route("/.well-known/mcp/server-card.json", get(handle_server_card))
}

/// Umami credentials supplied on the `initialize` request
#[derive(Debug, Default, Deserialize)]
pub struct ConnectionParams {
    #[serde(alias = "umamiHost")]
    host: Option<String>,
    #[serde(alias = "umamiUsername")]
    username: Option<String>,
    #[serde(alias = "umamiPassword")]
    password: Option<String>,
}

impl ConnectionParams {
    fn into_config(self) -> Option<Config> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        Some(Config {
            url: non_empty(self.host)?,
            username: non_empty(self.username)?,
            password: non_empty(self.password)?,
        })
    }
}

/// Session id carried by the request. An empty header counts as absent.
fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Endpoint: POST /mcp
async fn handle_mcp(
    State(state): State<SharedState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_message(&body) {
        Ok(Message::Request(request)) => request,
        Ok(Message::Notification(notification)) => {
            debug!(method = %notification.method, "Ignoring notification");
            return StatusCode::ACCEPTED.into_response();
        }
        Err(err) => return Json(rpc_error(Value::Null, err)).into_response(),
    };

    if request.method == "initialize" {
        return handle_initialize(&state, &uri, request).await;
    }

    match state.resolve(session_id(&headers)) {
        Ok(server) => Json(server.handle_request(request).await).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Authenticates, opens a session and answers the handshake on it.
async fn handle_initialize(
    state: &SharedState,
    uri: &Uri,
    request: JsonRpcRequest,
) -> Response {
    let id = request.id.clone().unwrap_or(Value::Null);

    // Only the handshake reads the query string; other calls ignore it.
    let params = match Query::<ConnectionParams>::try_from_uri(uri) {
        Ok(Query(params)) => params,
        Err(rejection) => {
            let err = RpcError::invalid_params(format!(
                "Invalid query params: {}",
                rejection.body_text()
            ));
            return Json(rpc_error(id, err)).into_response();
        }
    };

    let Some(config) = params.into_config() else {
        let err = RpcError::invalid_params("Missing required query params: host, username, password");
        return Json(rpc_error(id, err)).into_response();
    };

    let (session_id, server) = match state.create(&config).await {
        Ok(created) => created,
        Err(e) => {
            warn!(host = %config.url, error = %e, "Session authentication failed");
            let err = RpcError::internal(format!("Authentication failed: {e}"));
            return Json(rpc_error(id, err)).into_response();
        }
    };

    let mut response = Json(server.handle_request(request).await).into_response();
    match HeaderValue::from_str(&session_id) {
        Ok(value) => {
            response.headers_mut().insert(MCP_SESSION_HEADER, value);
        }
        Err(e) => warn!(error = %e, "Unencodable session id"),
    }
    response
}

/// Endpoint: DELETE /mcp
async fn handle_delete(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match state.terminate(session_id(&headers)) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Endpoint: GET /.well-known/mcp/server-card.json
async fn handle_server_card(State(state): State<SharedState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .registry()
        .tools()
        .iter()
        .map(|tool| json!({ "name": tool.name, "description": tool.description }))
        .collect();

    Json(json!({
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION
        },
        "protocolVersion": LATEST_PROTOCOL_VERSION,
        "transport": {
            "type": "streamable-http",
            "endpoint": MCP_PATH
        },
        "tools": tools
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(host: Option<&str>, username: Option<&str>, password: Option<&str>) -> ConnectionParams {
        ConnectionParams {
            host: host.map(String::from),
            username: username.map(String::from),
            password: password.map(String::from),
        }
    }

    #[test]
    fn test_connection_params_require_all_fields() {
        let config = params(Some("http://umami"), Some("admin"), Some("pw"))
            .into_config()
            .unwrap();
        assert_eq!(config.url, "http://umami");

        assert!(params(None, Some("admin"), Some("pw")).into_config().is_none());
        assert!(params(Some("http://umami"), Some(""), Some("pw")).into_config().is_none());
    }

    #[test]
    fn test_connection_params_aliases() {
        let parsed: ConnectionParams =
            serde_json::from_value(json!({"umamiHost": "h", "umamiUsername": "u", "umamiPassword": "p"}))
                .unwrap();
        let config = parsed.into_config().unwrap();
        assert_eq!((config.url.as_str(), config.username.as_str()), ("h", "u"));
    }

    #[test]
    fn test_empty_session_header_is_absent() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), None);

        headers.insert(MCP_SESSION_HEADER, HeaderValue::from_static(""));
        assert_eq!(session_id(&headers), None);

        headers.insert(MCP_SESSION_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(session_id(&headers), Some("abc"));
    }
}
