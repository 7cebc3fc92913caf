use std::sync::Arc;

use tracing::debug;

use dg_core::ReconcileOutcome;

use crate::usecases::reconcile::{InstanceReconciler, ReconcileError};

/// "Add instance" form: URL and token typed by the user.
pub struct ManualEntry {
    reconciler: Arc<InstanceReconciler>,
}

impl ManualEntry {
    pub fn new(reconciler: Arc<InstanceReconciler>) -> Self {
        Self { reconciler }
    }

    /// Empty fields are rejected here, before any request is made.
    pub async fn submit(&self, url: &str, token: &str) -> Result<ReconcileOutcome, ReconcileError> {
        if url.trim().is_empty() {
            return Err(ReconcileError::EmptyUrl);
        }
        if token.trim().is_empty() {
            return Err(ReconcileError::EmptyToken);
        }
        debug!("manual enrollment submitted");
        self.reconciler.reconcile(url, token).await
    }
}
