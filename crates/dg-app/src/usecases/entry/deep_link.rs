use std::sync::Arc;

use tracing::{debug, info};

use dg_core::{DeepLink, ReconcileOutcome};

use crate::usecases::reconcile::{InstanceReconciler, ReconcileError};

/// Handles `defguard://` links delivered by the OS.
pub struct DeepLinkHandler {
    reconciler: Arc<InstanceReconciler>,
}

impl DeepLinkHandler {
    pub fn new(reconciler: Arc<InstanceReconciler>) -> Self {
        Self { reconciler }
    }

    /// Returns `None` when the link is not one we understand; such links
    /// are ignored without telling the user.
    pub async fn handle(&self, raw: &str) -> Option<Result<ReconcileOutcome, ReconcileError>> {
        let link = match DeepLink::parse(raw) {
            Ok(link) => link,
            Err(err) => {
                debug!(error = %err, "ignoring deep link");
                return None;
            }
        };

        match link {
            DeepLink::AddInstance { url, token } => {
                info!(proxy_url = %url, "deep link enrollment");
                Some(self.reconciler.reconcile(url.as_str(), &token).await)
            }
        }
    }
}
