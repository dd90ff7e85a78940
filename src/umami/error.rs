//! Error types for the Umami REST client.

/// Result type for upstream operations.
pub type UmamiResult<T> = Result<T, UmamiError>;

/// Failures raised while talking to an Umami server.
#[derive(Debug, thiserror::Error)]
pub enum UmamiError {
    /// The login endpoint answered with something other than 200.
    #[error("authentication failed with status {0}")]
    AuthStatus(u16),

    /// The login request never completed.
    #[error("authentication request failed: {0}")]
    AuthRequest(#[source] reqwest::Error),

    /// The login response did not carry a usable token.
    #[error("failed to decode auth response: {0}")]
    AuthDecode(#[source] reqwest::Error),

    /// The API answered with status >= 400.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Network failure or timeout.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body matched none of the accepted shapes.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UmamiError {
    /// Whether this error came out of the login exchange.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthStatus(_) | Self::AuthRequest(_) | Self::AuthDecode(_)
        )
    }

    /// HTTP status reported by the upstream, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthStatus(status) | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
