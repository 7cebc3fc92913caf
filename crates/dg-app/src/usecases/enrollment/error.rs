use dg_core::enrollment::StepError;
use dg_core::ports::SessionStoreError;
use dg_core::proxy::{server_messages, ProxyApiError};
use dg_core::ErrorKind;

/// Errors produced by the enrollment orchestrator.
///
/// Failures of a step submission are not errors at this level: they end up
/// as [`StepError`]s on the wizard state.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentError {
    #[error("no enrollment session")]
    NoSession,
    #[error("session store failed: {0}")]
    Store(#[from] SessionStoreError),
    #[error("navigation queue closed")]
    QueueClosed,
}

/// Convert a proxy failure into the error shown on the current step.
pub fn step_error_from(err: &ProxyApiError) -> StepError {
    match err {
        ProxyApiError::Transport(message) => {
            StepError::request(ErrorKind::Network, format!("network error: {message}"))
        }
        ProxyApiError::Malformed(message) => StepError::request(
            ErrorKind::MalformedResponse,
            format!("unexpected response from proxy: {message}"),
        ),
        ProxyApiError::Status { .. }
            if err.has_message(server_messages::TOKEN_EXPIRED)
                || err.has_message(server_messages::INVALID_TOKEN) =>
        {
            StepError::request(ErrorKind::SessionExpired, "enrollment session expired")
        }
        ProxyApiError::Status { .. } if err.is_unauthorized() => {
            StepError::request(ErrorKind::TokenRejected, "rejected by proxy")
        }
        ProxyApiError::Status { status, message } => StepError::request(
            ErrorKind::Network,
            message
                .clone()
                .unwrap_or_else(|| format!("proxy returned status {status}")),
        ),
    }
}
