//! MCP Protocol Models and Constants
//!
//! This module contains the JSON-RPC envelope types, the error taxonomy and
//! the constants shared by both transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// MCP Constants
// =============================================================================

/// Server identifier
pub const SERVER_NAME: &str = "umami-mcp";
/// Server version reported during the handshake
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Newest protocol revision this server speaks
pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";
/// Protocol revisions accepted from clients, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &[LATEST_PROTOCOL_VERSION, "2024-11-05"];
/// Header carrying the HTTP session identifier
pub const MCP_SESSION_HEADER: &str = "mcp-session-id";

// =============================================================================
// MCP Protocol Models
// =============================================================================

/// Standard JSON-RPC 2.0 Request envelope
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version (should be "2.0")
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,

    /// Method name to invoke
    #[serde(default)]
    pub method: String,

    /// Parameters for the method
    pub params: Option<Value>,

    /// Request identifier; absent or `null` for notifications
    pub id: Option<Value>,
}

/// A decoded inbound message
#[derive(Debug, Clone)]
pub enum Message {
    /// Carries an `id` and must be answered exactly once
    Request(JsonRpcRequest),
    /// No `id`; never answered
    Notification(JsonRpcRequest),
}

/// Parses one raw frame. Anything that is not a JSON object with a usable
/// envelope is a parse error.
pub fn parse_message(raw: &[u8]) -> Result<Message, RpcError> {
    let request: JsonRpcRequest =
        serde_json::from_slice(raw).map_err(|_| RpcError::parse_error())?;

    Ok(if request.id.is_some() {
        Message::Request(request)
    } else {
        Message::Notification(request)
    })
}

/// Standard JSON-RPC 2.0 Response envelope.
///
/// Built through [`super::helpers::rpc_success`] and
/// [`super::helpers::rpc_error`], which set exactly one of `result`/`error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,

    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Malformed outer envelope
    pub fn parse_error() -> Self {
        Self::new(Self::PARSE_ERROR, "Parse error")
    }

    pub fn method_not_found() -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method not found")
    }

    /// Missing or malformed arguments, or an unknown tool/prompt/resource
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    /// Upstream authentication, request or decode failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}
