//! # Dependency injection
//!
//! The only place that depends on dg-app and dg-infra together. It
//! assembles adapters into use cases and makes no decisions of its own.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use dg_app::usecases::enrollment::{EnrollmentDeps, EnrollmentOrchestrator, NavigationQueue};
use dg_app::usecases::reconcile::{InstanceReconciler, ReconcileDeps};
use dg_app::{ConnectLocation, DeepLinkHandler, ManualEntry, MfaOrchestrator, ProvisioningWatcher};
use dg_core::ports::{
    BrowserPort, ClockPort, EnrollmentEventPort, KeyGeneratorPort, MfaPromptPort,
    NativeBackendPort, NavigatorPort,
};
use dg_infra::fs::app_data_dir::{backend_dir, sessions_dir};
use dg_infra::{
    FileNativeBackend, FileProvisioningSource, FileSessionStore, ReqwestProxyClient, SystemBrowser,
    SystemClock, TungsteniteRemoteMfaSocket, WireguardKeyGenerator,
};

use super::config::ResolvedConfig;
use super::device_name::default_device_name;

pub type WiringResult<T> = Result<T, WiringError>;

/// Infrastructure that failed to initialize.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClient(String),

    #[error("Native backend initialization failed: {0}")]
    NativeBackend(String),
}

/// Ports implemented by the presentation layer.
#[derive(Clone)]
pub struct UiPorts {
    pub navigator: Arc<dyn NavigatorPort>,
    pub events: Arc<dyn EnrollmentEventPort>,
    pub prompt: Arc<dyn MfaPromptPort>,
    pub browser: Arc<dyn BrowserPort>,
}

impl UiPorts {
    pub fn with_system_browser(
        navigator: Arc<dyn NavigatorPort>,
        events: Arc<dyn EnrollmentEventPort>,
        prompt: Arc<dyn MfaPromptPort>,
    ) -> Self {
        Self {
            navigator,
            events,
            prompt,
            browser: Arc::new(SystemBrowser),
        }
    }
}

/// Assembled client: every entry point plus the wizard runtime.
pub struct ClientApp {
    pub enrollment: Arc<EnrollmentOrchestrator>,
    pub queue: NavigationQueue,
    pub manual: ManualEntry,
    pub deep_link: DeepLinkHandler,
    pub provisioning: Arc<ProvisioningWatcher>,
    pub connect: Arc<ConnectLocation>,
    pub mfa: Arc<MfaOrchestrator>,
    pub native: Arc<FileNativeBackend>,
    pub session_store: Arc<FileSessionStore>,
    pub device_name: String,
    queue_task: JoinHandle<()>,
}

impl Drop for ClientApp {
    fn drop(&mut self) {
        self.queue_task.abort();
    }
}

/// Wire the client. `session_scope` continues an earlier session's stored
/// enrollment; `None` starts a fresh scope.
pub async fn wire(
    config: &ResolvedConfig,
    session_scope: Option<String>,
    ui: UiPorts,
) -> WiringResult<ClientApp> {
    let proxy = Arc::new(
        ReqwestProxyClient::new(config.http_timeout)
            .map_err(|e| WiringError::HttpClient(format!("{e:#}")))?,
    );
    let native = Arc::new(
        FileNativeBackend::open(backend_dir(&config.data_dir))
            .await
            .map_err(|e| WiringError::NativeBackend(format!("{e:#}")))?,
    );
    let sessions = sessions_dir(&config.data_dir);
    let session_store = Arc::new(match session_scope {
        Some(scope) => FileSessionStore::new(sessions, scope),
        None => FileSessionStore::with_new_scope(sessions),
    });
    let keys: Arc<dyn KeyGeneratorPort> = Arc::new(WireguardKeyGenerator);
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let native_port: Arc<dyn NativeBackendPort> = native.clone();

    let enrollment = Arc::new(EnrollmentOrchestrator::new(EnrollmentDeps {
        api: proxy.clone(),
        store: session_store.clone(),
        native: native_port.clone(),
        keys: keys.clone(),
        clock: clock.clone(),
        navigator: ui.navigator.clone(),
        events: ui.events.clone(),
    }));
    let (queue, queue_task) = NavigationQueue::spawn(enrollment.clone());

    let device_name = default_device_name(&config.device_name);
    let reconciler = Arc::new(InstanceReconciler::new(
        ReconcileDeps {
            api: proxy.clone(),
            native: native_port.clone(),
            keys,
            clock,
            navigator: ui.navigator.clone(),
        },
        enrollment.clone(),
        device_name.clone(),
    ));

    let mfa = Arc::new(MfaOrchestrator::new(
        proxy,
        Arc::new(TungsteniteRemoteMfaSocket),
        ui.browser,
        ui.prompt,
        config.mfa,
    ));
    let connect = Arc::new(ConnectLocation::new(native_port.clone(), mfa.clone()));
    let provisioning = Arc::new(ProvisioningWatcher::new(
        Arc::new(FileProvisioningSource::new(config.provisioning_file.clone())),
        native_port,
        reconciler.clone(),
    ));

    info!(
        data_dir = %config.data_dir.display(),
        session_scope = session_store.scope(),
        "client wired"
    );

    Ok(ClientApp {
        enrollment,
        queue,
        manual: ManualEntry::new(reconciler.clone()),
        deep_link: DeepLinkHandler::new(reconciler),
        provisioning,
        connect,
        mfa,
        native,
        session_store,
        device_name,
        queue_task,
    })
}
