mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use dg_app::usecases::entry::{DeepLinkHandler, ManualEntry, ProvisioningWatcher};
use dg_app::usecases::reconcile::ReconcileError;
use dg_core::ports::{ProvisioningRequest, ProvisioningSourcePort};
use dg_core::proxy::ProxyApiError;
use dg_core::{ErrorKind, ReconcileOutcome};

use support::*;

fn harness() -> Harness {
    Harness::new(
        FakeEnrollmentApi::with_start(
            start_response(false, now() + chrono::Duration::hours(1)),
            vec!["defguard_proxy=abc123"],
        ),
        vec![],
    )
}

#[derive(Default)]
struct FakeProvisioning {
    request: Mutex<Option<ProvisioningRequest>>,
    fail: bool,
}

impl FakeProvisioning {
    fn with(url: &str, token: &str) -> Self {
        Self {
            request: Mutex::new(Some(ProvisioningRequest {
                enrollment_url: url.into(),
                enrollment_token: token.into(),
            })),
            fail: false,
        }
    }
}

#[async_trait]
impl ProvisioningSourcePort for FakeProvisioning {
    async fn read(&self) -> anyhow::Result<Option<ProvisioningRequest>> {
        if self.fail {
            anyhow::bail!("permission denied");
        }
        Ok(self.request.lock().unwrap().clone())
    }
}

#[tokio::test]
async fn manual_entry_rejects_empty_fields_locally() {
    let h = harness();
    let manual = ManualEntry::new(Arc::clone(&h.reconciler));

    let err = manual.submit("   ", "abc123").await.unwrap_err();
    assert!(matches!(err, ReconcileError::EmptyUrl));
    assert_eq!(err.kind(), ErrorKind::TokenRejected);

    let err = manual.submit("https://vpn.example.com", "").await.unwrap_err();
    assert!(matches!(err, ReconcileError::EmptyToken));

    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn manual_entry_reaches_the_reconciler() {
    let h = harness();
    let manual = ManualEntry::new(Arc::clone(&h.reconciler));

    let outcome = manual
        .submit(" https://vpn.example.com ", " abc123 ")
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::EnrollmentStarted);
    assert_eq!(h.api.calls(), vec!["start".to_string()]);
}

#[tokio::test]
async fn deep_link_starts_enrollment() {
    let h = harness();
    let links = DeepLinkHandler::new(Arc::clone(&h.reconciler));

    let outcome = links
        .handle("defguard://addinstance?token=abc123&url=https%3A%2F%2Fvpn.example.com")
        .await;

    assert!(matches!(outcome, Some(Ok(ReconcileOutcome::EnrollmentStarted))));
}

#[tokio::test]
async fn malformed_deep_links_are_ignored_silently() {
    let h = harness();
    let links = DeepLinkHandler::new(Arc::clone(&h.reconciler));

    for raw in [
        "defguard://addinstance?token=abc123",
        "defguard://addinstance?token=&url=https%3A%2F%2Fvpn.example.com",
        "defguard://removeinstance?token=abc123&url=https%3A%2F%2Fvpn.example.com",
        "https://addinstance?token=abc123&url=https%3A%2F%2Fvpn.example.com",
        "not a url",
    ] {
        assert!(links.handle(raw).await.is_none(), "{raw} should be ignored");
    }
    assert!(h.api.calls().is_empty());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test]
async fn provisioning_dispatches_each_pair_once() {
    let h = harness();
    let source = Arc::new(FakeProvisioning::with("https://vpn.example.com", "abc123"));
    let watcher = ProvisioningWatcher::new(source.clone(), h.native.clone(), Arc::clone(&h.reconciler));

    let first = watcher.check_once().await;
    assert!(matches!(first, Some(Ok(ReconcileOutcome::EnrollmentStarted))));
    assert!(watcher.check_once().await.is_none());
    assert_eq!(h.api.calls(), vec!["start".to_string()]);

    *source.request.lock().unwrap() = Some(ProvisioningRequest {
        enrollment_url: "https://vpn.example.com".into(),
        enrollment_token: "def456".into(),
    });
    assert!(watcher.check_once().await.is_some());
    assert_eq!(h.api.calls().len(), 2);
}

#[tokio::test]
async fn provisioning_retries_a_pair_after_a_network_error() {
    let h = harness();
    let reachable = h.api.start_reply.lock().unwrap().clone();
    *h.api.start_reply.lock().unwrap() =
        Some(Err(ProxyApiError::Transport("connection refused".into())));
    let source = Arc::new(FakeProvisioning::with("https://vpn.example.com", "abc123"));
    let watcher = ProvisioningWatcher::new(source, h.native.clone(), Arc::clone(&h.reconciler));

    let first = watcher.check_once().await;
    assert!(matches!(first, Some(Err(ref err)) if err.kind() == ErrorKind::Network));

    *h.api.start_reply.lock().unwrap() = reachable;
    let second = watcher.check_once().await;
    assert!(matches!(second, Some(Ok(ReconcileOutcome::EnrollmentStarted))));
    assert!(watcher.check_once().await.is_none());
    assert_eq!(h.api.calls().len(), 2);
}

#[tokio::test]
async fn provisioning_does_not_retry_a_rejected_token() {
    let h = harness();
    *h.api.start_reply.lock().unwrap() = Some(Err(ProxyApiError::Status {
        status: 400,
        message: Some("invalid token".into()),
    }));
    let source = Arc::new(FakeProvisioning::with("https://vpn.example.com", "abc123"));
    let watcher = ProvisioningWatcher::new(source, h.native.clone(), Arc::clone(&h.reconciler));

    assert!(matches!(watcher.check_once().await, Some(Err(_))));
    assert!(watcher.check_once().await.is_none());
    assert_eq!(h.api.calls().len(), 1);
}

#[tokio::test]
async fn provisioning_is_skipped_once_an_instance_exists() {
    let h = Harness::new(FakeEnrollmentApi::default(), vec![known_instance()]);
    let source = Arc::new(FakeProvisioning::with("https://vpn.example.com", "abc123"));
    let watcher = ProvisioningWatcher::new(source, h.native.clone(), Arc::clone(&h.reconciler));

    assert!(watcher.check_once().await.is_none());
    assert!(h.api.calls().is_empty());
}

#[tokio::test]
async fn unreadable_provisioning_source_is_skipped() {
    let h = harness();
    let source = Arc::new(FakeProvisioning {
        fail: true,
        ..Default::default()
    });
    let watcher = ProvisioningWatcher::new(source, h.native.clone(), Arc::clone(&h.reconciler));

    assert!(watcher.check_once().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn provisioning_watch_picks_up_a_late_file() {
    let h = harness();
    let source = Arc::new(FakeProvisioning::default());
    let watcher = Arc::new(ProvisioningWatcher::new(
        source.clone(),
        h.native.clone(),
        Arc::clone(&h.reconciler),
    ));
    let cancel = CancellationToken::new();
    let task = {
        let watcher = Arc::clone(&watcher);
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(Duration::from_secs(10), cancel).await })
    };

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(h.api.calls().is_empty());

    *source.request.lock().unwrap() = Some(ProvisioningRequest {
        enrollment_url: "https://vpn.example.com".into(),
        enrollment_token: "abc123".into(),
    });
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.api.calls(), vec!["start".to_string()]);

    cancel.cancel();
    task.await.unwrap();
}
