//! User-facing error taxonomy.
//!
//! Every failure that reaches the presentation layer is first converted into
//! one of these kinds at its call site. Raw transport errors never cross this
//! boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad credentials supplied by the user; recoverable by re-entry.
    TokenRejected,
    /// Deadline elapsed or the server reported an expired/invalid token.
    /// Terminal for the current attempt.
    SessionExpired,
    /// No response or a non-JSON response; recoverable by retry.
    Network,
    /// Server-side configuration gap for a specific MFA method.
    MethodUnavailable,
    /// Response failed shape validation; not retryable client-side.
    MalformedResponse,
    /// Client-enforced ceiling reached; distinct from a server error.
    Timeout,
}

impl ErrorKind {
    /// Whether the user can recover by retrying the same operation.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::TokenRejected)
    }
}
