use thiserror::Error;

use super::MfaMethod;
use crate::error_kind::ErrorKind;
use crate::proxy::{server_messages, ProxyApiError};

/// Classified MFA failure. Cancellation is not represented here.
///
/// 已分类的 MFA 错误（取消不算错误）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MfaError {
    #[error("invalid code")]
    InvalidCode,

    /// Challenge token is no longer accepted; restart from method selection.
    #[error("mfa session expired")]
    SessionExpired,

    #[error("login session not found")]
    SessionInvalidated,

    #[error("{0} is unavailable")]
    MethodUnavailable(MfaMethod),

    #[error("timed out waiting for authentication")]
    Timeout,

    #[error("unknown response from proxy")]
    UnknownResponse,

    #[error("connection to proxy closed unexpectedly")]
    ConnectionClosed,

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Server(String),
}

impl MfaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCode => ErrorKind::TokenRejected,
            Self::SessionExpired | Self::SessionInvalidated => ErrorKind::SessionExpired,
            Self::MethodUnavailable(_) => ErrorKind::MethodUnavailable,
            Self::Timeout => ErrorKind::Timeout,
            Self::UnknownResponse => ErrorKind::MalformedResponse,
            Self::ConnectionClosed | Self::Network(_) | Self::Server(_) => ErrorKind::Network,
        }
    }

    /// Classify a failed `client-mfa/finish` call.
    pub fn classify_finish(err: &ProxyApiError) -> Self {
        match err {
            ProxyApiError::Transport(message) => Self::Network(message.clone()),
            ProxyApiError::Malformed(_) => Self::UnknownResponse,
            // The message wins over the status: a dead token can come back as 401.
            ProxyApiError::Status { .. } if err.has_message(server_messages::INVALID_TOKEN) => {
                Self::SessionExpired
            }
            ProxyApiError::Status { .. }
                if err.has_message(server_messages::LOGIN_SESSION_NOT_FOUND) =>
            {
                Self::SessionInvalidated
            }
            ProxyApiError::Status { .. } if err.is_unauthorized() => Self::InvalidCode,
            ProxyApiError::Status { status, message } => Self::Server(
                message
                    .clone()
                    .unwrap_or_else(|| format!("proxy returned status {status}")),
            ),
        }
    }

    /// Classify a non-pending response while polling for an OpenID result.
    ///
    /// Unlike [`Self::classify_finish`] there is no code that could be wrong.
    pub fn classify_poll(err: &ProxyApiError) -> Self {
        match Self::classify_finish(err) {
            Self::InvalidCode => Self::Server(
                err.message()
                    .map(str::to_string)
                    .unwrap_or_else(|| "unauthorized".to_string()),
            ),
            other => other,
        }
    }

    /// Classify a failed `client-mfa/start` call for `method`.
    pub fn classify_start(method: MfaMethod, err: &ProxyApiError) -> Self {
        match (method, err) {
            (MfaMethod::OpenId, _) => Self::MethodUnavailable(method),
            (_, ProxyApiError::Transport(message)) => Self::Network(message.clone()),
            (_, ProxyApiError::Malformed(_)) => Self::UnknownResponse,
            (_, ProxyApiError::Status { status, message }) => Self::Server(
                message
                    .clone()
                    .unwrap_or_else(|| format!("proxy returned status {status}")),
            ),
        }
    }

    /// The challenge token is dead; the user has to pick a method again.
    pub fn requires_restart(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::SessionInvalidated)
    }

    /// Same challenge can be attempted again (e.g. a new code typed).
    pub fn is_retryable_in_place(&self) -> bool {
        matches!(self, Self::InvalidCode)
    }
}
