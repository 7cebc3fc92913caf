use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dg_core::ports::{NativeBackendPort, ProvisioningRequest, ProvisioningSourcePort};
use dg_core::{ErrorKind, ReconcileOutcome};

use crate::usecases::reconcile::{InstanceReconciler, ReconcileError};

/// Picks up an enrollment request placed on the machine by an administrator.
///
/// Acts only while no instance exists locally, and dispatches each distinct
/// (url, token) pair once. A pair that failed on the network is tried again
/// on the next check.
pub struct ProvisioningWatcher {
    source: Arc<dyn ProvisioningSourcePort>,
    native: Arc<dyn NativeBackendPort>,
    reconciler: Arc<InstanceReconciler>,
    dispatched: Mutex<HashSet<ProvisioningRequest>>,
}

impl ProvisioningWatcher {
    pub fn new(
        source: Arc<dyn ProvisioningSourcePort>,
        native: Arc<dyn NativeBackendPort>,
        reconciler: Arc<InstanceReconciler>,
    ) -> Self {
        Self {
            source,
            native,
            reconciler,
            dispatched: Mutex::new(HashSet::new()),
        }
    }

    /// Check the source once. `None` means nothing was dispatched.
    pub async fn check_once(&self) -> Option<Result<ReconcileOutcome, ReconcileError>> {
        let request = match self.source.read().await {
            Ok(Some(request)) => request,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "failed to read provisioning source");
                return None;
            }
        };

        match self.native.list_instances().await {
            Ok(instances) if !instances.is_empty() => {
                debug!("instances already configured, ignoring provisioning request");
                return None;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "failed to list instances for provisioning");
                return None;
            }
        }

        if !self.dispatched.lock().await.insert(request.clone()) {
            return None;
        }

        info!(url = %request.enrollment_url, "dispatching provisioning request");
        let result = self
            .reconciler
            .reconcile(&request.enrollment_url, &request.enrollment_token)
            .await;
        if let Err(err) = &result {
            if err.kind() == ErrorKind::Network {
                debug!("provisioning request will be retried on the next check");
                self.dispatched.lock().await.remove(&request);
            }
        }
        Some(result)
    }

    /// Check at startup and then every `interval` until cancelled.
    pub async fn watch(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Some(Err(err)) = self.check_once().await {
                warn!(error = %err, kind = ?err.kind(), "provisioning enrollment failed");
            }
        }
        debug!("provisioning watcher stopped");
    }
}
