//! Session Module
//!
//! HTTP-transport sessions: the concurrent session registry and the errors
//! raised when a request cannot be routed to a session.

pub mod manager;

// Re-export commonly used types for convenience
pub use manager::{SessionError, SessionManager, SharedState};
