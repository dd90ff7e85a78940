//! HTTP Session Management
//!
//! Each HTTP session owns one authenticated Umami client wrapped in its own
//! dispatcher. Sessions live in a concurrent map keyed by an opaque random id.

use crate::config::Config;
use crate::mcp::{CapabilityRegistry, McpServer};
use crate::umami::{UmamiClient, UmamiResult};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// =============================================================================
// Errors
// =============================================================================

/// Why a request could not be routed to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Missing Mcp-Session-Id header")]
    MissingHeader,

    #[error("Invalid session")]
    Unknown,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::MissingHeader => StatusCode::BAD_REQUEST,
            SessionError::Unknown => StatusCode::NOT_FOUND,
        };
        (status, self.to_string()).into_response()
    }
}

// =============================================================================
// Session Manager
// =============================================================================

/// Shared application state that can be safely passed between threads
pub type SharedState = Arc<SessionManager>;

/// Owns every live session
pub struct SessionManager {
    /// Live sessions, keyed by session id.
    /// DashMap allows concurrent access without external Mutexes.
    sessions: DashMap<String, Arc<McpServer>>,

    /// Catalog handed to every new dispatcher
    registry: Arc<CapabilityRegistry>,
}

impl SessionManager {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            sessions: DashMap::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Authenticates against `config` and, only on success, publishes a new
    /// session. Returns its id and dispatcher.
    pub async fn create(&self, config: &Config) -> UmamiResult<(String, Arc<McpServer>)> {
        let client = UmamiClient::connect(config).await?;
        let server = Arc::new(McpServer::new(client, self.registry.clone()));

        let session_id = new_session_id();
        self.sessions.insert(session_id.clone(), server.clone());

        info!(
            session = %&session_id[..8],
            host = %config.url,
            active = self.sessions.len(),
            "New session"
        );

        Ok((session_id, server))
    }

    /// Looks up the dispatcher for the id carried by a request.
    pub fn resolve(&self, session_id: Option<&str>) -> Result<Arc<McpServer>, SessionError> {
        let session_id = session_id.ok_or(SessionError::MissingHeader)?;

        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::Unknown)
    }

    /// Ends a session. In-flight calls holding its dispatcher run to completion.
    pub fn terminate(&self, session_id: Option<&str>) -> Result<(), SessionError> {
        let session_id = session_id.ok_or(SessionError::MissingHeader)?;

        self.sessions
            .remove(session_id)
            .map(|_| info!(session = %&session_id[..session_id.len().min(8)], "Session terminated"))
            .ok_or(SessionError::Unknown)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 128 random bits rendered as 32 lowercase hex characters.
fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}
