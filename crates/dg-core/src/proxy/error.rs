use thiserror::Error;

/// Error strings the proxy puts in `{"error": "..."}` bodies that drive
/// client behavior. Matching is case-insensitive on the trimmed message.
pub mod server_messages {
    pub const TOKEN_EXPIRED: &str = "token expired";
    pub const INVALID_TOKEN: &str = "invalid token";
    pub const LOGIN_SESSION_NOT_FOUND: &str = "login session not found";
}

/// Failure talking to the proxy, before any user-facing classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyApiError {
    #[error("proxy responded with HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed proxy response: {0}")]
    Malformed(String),
}

impl ProxyApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Whether the server message equals `expected` (case-insensitive).
    pub fn has_message(&self, expected: &str) -> bool {
        self.message()
            .map(|m| m.trim().eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }

    /// HTTP 428: the OpenID login has not completed yet.
    pub fn is_precondition_required(&self) -> bool {
        self.status() == Some(428)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
