//! Umami MCP Server Library
//!
//! This library exposes Umami web analytics to MCP (Model Context Protocol)
//! clients over a line-delimited stdio stream or a session-based HTTP endpoint.

// Domain modules
pub mod mcp;
pub mod umami;

// Infrastructure
pub mod config;
pub mod router;
pub mod session;
