use async_trait::async_trait;

use crate::mfa::{MfaError, MfaMethod, MfaStatus, QrPayload};

/// How the user answered a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryChoice {
    Retry,
    /// Go back to method selection.
    ChangeMethod,
    /// Give up; the error is the outcome of the attempt.
    Dismiss,
}

/// Interaction surface of the MFA dialog.
///
/// Returning `None` from a prompt means the user closed the dialog.
#[async_trait]
pub trait MfaPromptPort: Send + Sync {
    async fn choose_method(&self, available: &[MfaMethod]) -> Option<MfaMethod>;

    async fn request_code(&self, method: MfaMethod) -> Option<String>;

    async fn offer_retry(&self, error: &MfaError) -> RetryChoice;

    async fn show_qr(&self, payload: &QrPayload);

    async fn report(&self, status: MfaStatus);
}
