//! MCP Protocol Helpers
//!
//! This module contains helper functions for JSON-RPC envelope construction
//! and tool result packaging.

use super::models::{JsonRpcResponse, RpcError};
use serde::Serialize;
use serde_json::{json, Value};

/// Builds a JSON-RPC 2.0 success response.
///
/// # Arguments
///
/// * `id` – The request identifier that must be echoed back.
/// * `result` – The payload representing the successful outcome.
pub fn rpc_success(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC 2.0 error response.
///
/// # Arguments
///
/// * `id` – The request identifier (or `null` if unavailable).
/// * `error` – The classified failure.
pub fn rpc_error(id: Value, error: RpcError) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        id,
        result: None,
        error: Some(error),
    }
}

/// Wraps a payload as a single pretty-printed text content block.
pub fn text_content<T: Serialize>(payload: &T) -> Result<Value, RpcError> {
    let text = serde_json::to_string_pretty(payload)
        .map_err(|e| RpcError::internal(format!("Failed to encode result: {e}")))?;

    Ok(json!({
        "content": [{ "type": "text", "text": text }]
    }))
}
