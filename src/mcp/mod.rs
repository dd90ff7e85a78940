//! Model Context Protocol (MCP) Module
//!
//! This module contains all MCP protocol implementation, including:
//! - Protocol models (envelopes, errors, constants)
//! - RPC helpers (success/error responses, text content)
//! - The static tool/prompt/resource registry
//! - Tool execution and the method dispatcher
//! - The stdio transport and the HTTP route handlers

pub mod handlers;
pub mod helpers;
pub mod models;
pub mod registry;
pub mod server;
pub mod stdio;
pub mod tools;

// Re-export commonly used types and functions
pub use handlers::routes;
pub use registry::CapabilityRegistry;
pub use server::McpServer;
