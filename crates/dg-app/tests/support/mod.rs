//! Hand-written port fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::broadcast;

use dg_app::usecases::enrollment::{EnrollmentDeps, EnrollmentOrchestrator};
use dg_app::usecases::reconcile::{InstanceReconciler, ReconcileDeps};
use dg_core::enrollment::{DeviceKeys, PersistedEnrollment, StepIndicator, WizardState};
use dg_core::mfa::{MfaError, MfaMethod, MfaStatus, PresharedKey, QrPayload};
use dg_core::ports::{
    BrowserPort, ClientMfaApiPort, ClockPort, EnrollmentApiPort, EnrollmentEventPort, EnrollmentSessionStorePort,
    KeyGeneratorPort, MfaPromptPort, NativeBackendError, NativeBackendPort, NativeEvent,
    NavigatorPort, ProxyAuth, RemoteMfaChannel, RemoteMfaFrame, RemoteMfaSocketPort, RetryChoice,
    SaveDeviceConfig, SessionStoreError,
};
use dg_core::proxy::{
    ActivateUserRequest, AdminInfo, ClientMfaFinishRequest, ClientMfaFinishResponse,
    ClientMfaStartRequest, ClientMfaStartResponse, CreateDeviceRequest, DeviceInfo, DeviceResponse,
    EnrollmentSettings, EnrollmentStartReply, EnrollmentStartRequest, EnrollmentStartResponse,
    InstanceInfo, NetworkInfoRequest, ProxyApiError, RegisterMfaFinishRequest,
    RegisterMfaFinishResponse, RegisterMfaStartRequest, RegisterMfaStartResponse, UserInfo,
};
use dg_core::{Instance, InstanceId, LocationId, ProxyUrl, Route, SecretString};

static TRACE_INIT: Once = Once::new();

/// Route use-case logs to the test output; `RUST_LOG` picks the level.
pub fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub const INSTANCE_UUID: &str = "3f0b7c2e-8d1a-4c56-9e2f-5a7b1c9d0e42";
pub const DEVICE_PUBKEY: &str = "aGVsbG8td29ybGQtZGV2aWNlLWtleS0zMmJ5dGVzIT0=";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

pub fn instance_info(id: &str) -> InstanceInfo {
    InstanceInfo {
        id: id.to_string(),
        name: "Example".into(),
        url: "https://core.example.com".into(),
        proxy_url: "https://vpn.example.com".into(),
        username: "jdoe".into(),
    }
}

pub fn start_response(enrolled: bool, deadline: DateTime<Utc>) -> EnrollmentStartResponse {
    EnrollmentStartResponse {
        admin: AdminInfo {
            name: "Admin".into(),
            phone_number: None,
            email: "admin@example.com".into(),
        },
        user: UserInfo {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            login: "jdoe".into(),
            email: "jane@example.com".into(),
            phone_number: None,
            is_active: enrolled,
            enrolled,
            device_names: vec![],
        },
        deadline_timestamp: deadline.timestamp(),
        final_page_content: "Welcome aboard".into(),
        vpn_setup_optional: false,
        instance: instance_info(INSTANCE_UUID),
        settings: EnrollmentSettings {
            mfa_required: true,
            mfa_skippable: false,
        },
    }
}

pub fn device_response(pubkey: &str) -> DeviceResponse {
    DeviceResponse {
        device: DeviceInfo {
            id: 7,
            name: "laptop".into(),
            pubkey: pubkey.to_string(),
            user_id: 1,
            created_at: None,
        },
        configs: vec![],
        instance: instance_info(INSTANCE_UUID),
    }
}

pub fn known_instance() -> Instance {
    Instance {
        id: InstanceId::from(INSTANCE_UUID),
        name: "Example".into(),
        proxy_url: ProxyUrl::parse("https://vpn.example.com").unwrap(),
        pubkey: "existing-device-pubkey".into(),
        locations: vec![dg_core::Location {
            id: LocationId(1),
            instance_id: InstanceId::from(INSTANCE_UUID),
            name: "office".into(),
            mfa_method: None,
        }],
    }
}

// ===== Enrollment API =====

#[derive(Default)]
pub struct FakeEnrollmentApi {
    pub start_reply: Mutex<Option<Result<EnrollmentStartReply, ProxyApiError>>>,
    pub create_device_reply: Mutex<Option<Result<DeviceResponse, ProxyApiError>>>,
    pub activate_replies: Mutex<VecDeque<Result<(), ProxyApiError>>>,
    pub calls: Mutex<Vec<String>>,
    pub cookies_seen: Mutex<Vec<String>>,
    pub created_devices: Mutex<Vec<CreateDeviceRequest>>,
    pub activations: Mutex<Vec<ActivateUserRequest>>,
    pub network_info_requests: Mutex<Vec<NetworkInfoRequest>>,
}

impl FakeEnrollmentApi {
    pub fn with_start(response: EnrollmentStartResponse, set_cookies: Vec<&str>) -> Self {
        let api = Self::default();
        *api.start_reply.lock().unwrap() = Some(Ok(EnrollmentStartReply {
            body: response,
            set_cookies: set_cookies.into_iter().map(String::from).collect(),
        }));
        api
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str, auth: Option<&ProxyAuth>) {
        self.calls.lock().unwrap().push(call.to_string());
        if let Some(auth) = auth {
            self.cookies_seen.lock().unwrap().push(auth.cookie.clone());
        }
    }
}

#[async_trait]
impl EnrollmentApiPort for FakeEnrollmentApi {
    async fn start(
        &self,
        _proxy_url: &ProxyUrl,
        _request: EnrollmentStartRequest,
    ) -> Result<EnrollmentStartReply, ProxyApiError> {
        self.record("start", None);
        self.start_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(ProxyApiError::Transport("no start reply".into())))
    }

    async fn create_device(
        &self,
        auth: &ProxyAuth,
        request: CreateDeviceRequest,
    ) -> Result<DeviceResponse, ProxyApiError> {
        self.record("create_device", Some(auth));
        let pubkey = request.pubkey.clone();
        self.created_devices.lock().unwrap().push(request);
        self.create_device_reply
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(device_response(&pubkey)))
    }

    async fn activate_user(
        &self,
        auth: &ProxyAuth,
        request: ActivateUserRequest,
    ) -> Result<(), ProxyApiError> {
        self.record("activate_user", Some(auth));
        self.activations.lock().unwrap().push(request);
        self.activate_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn network_info(
        &self,
        auth: &ProxyAuth,
        request: NetworkInfoRequest,
    ) -> Result<DeviceResponse, ProxyApiError> {
        self.record("network_info", Some(auth));
        let pubkey = request.pubkey.clone();
        self.network_info_requests.lock().unwrap().push(request);
        Ok(device_response(&pubkey))
    }

    async fn register_mfa_start(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaStartRequest,
    ) -> Result<RegisterMfaStartResponse, ProxyApiError> {
        self.record("register_mfa_start", Some(auth));
        Ok(RegisterMfaStartResponse {
            totp_secret: (request.method == MfaMethod::Totp).then(|| "JBSWY3DPEHPK3PXP".to_string()),
        })
    }

    async fn register_mfa_finish(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaFinishRequest,
    ) -> Result<RegisterMfaFinishResponse, ProxyApiError> {
        self.record("register_mfa_finish", Some(auth));
        if request.code == "000000" {
            return Err(ProxyApiError::Status {
                status: 401,
                message: None,
            });
        }
        Ok(RegisterMfaFinishResponse {
            recovery_codes: vec!["alpha-1".into(), "bravo-2".into()],
        })
    }
}

// ===== Native backend =====

pub struct FakeNative {
    pub instances: Mutex<Vec<Instance>>,
    pub saved: Mutex<Vec<SaveDeviceConfig>>,
    pub updated: Mutex<Vec<(InstanceId, DeviceResponse)>>,
    pub connects: Mutex<Vec<(InstanceId, LocationId, Option<PresharedKey>)>>,
    pub events: broadcast::Sender<NativeEvent>,
}

impl FakeNative {
    pub fn new(instances: Vec<Instance>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            instances: Mutex::new(instances),
            saved: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            connects: Mutex::new(Vec::new()),
            events,
        }
    }
}

#[async_trait]
impl NativeBackendPort for FakeNative {
    async fn list_instances(&self) -> Result<Vec<Instance>, NativeBackendError> {
        Ok(self.instances.lock().unwrap().clone())
    }

    async fn save_device_config(
        &self,
        config: SaveDeviceConfig,
    ) -> Result<Instance, NativeBackendError> {
        let instance = Instance {
            id: InstanceId::from(config.response.instance.id.clone()),
            name: config.response.instance.name.clone(),
            proxy_url: config.proxy_url.clone(),
            pubkey: config.keys.public.clone(),
            locations: vec![],
        };
        self.saved.lock().unwrap().push(config);
        self.instances.lock().unwrap().push(instance.clone());
        Ok(instance)
    }

    async fn update_instance(
        &self,
        instance_id: &InstanceId,
        response: DeviceResponse,
    ) -> Result<(), NativeBackendError> {
        self.updated
            .lock()
            .unwrap()
            .push((instance_id.clone(), response));
        Ok(())
    }

    async fn connect(
        &self,
        instance_id: &InstanceId,
        location_id: LocationId,
        preshared_key: Option<PresharedKey>,
    ) -> Result<(), NativeBackendError> {
        self.connects
            .lock()
            .unwrap()
            .push((instance_id.clone(), location_id, preshared_key));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<NativeEvent> {
        self.events.subscribe()
    }
}

// ===== Session store =====

#[derive(Default)]
pub struct MemoryStore {
    pub data: Mutex<Option<PersistedEnrollment>>,
    pub clears: Mutex<usize>,
}

#[async_trait]
impl EnrollmentSessionStorePort for MemoryStore {
    async fn load(&self) -> Result<Option<PersistedEnrollment>, SessionStoreError> {
        Ok(self.data.lock().unwrap().clone())
    }

    async fn save(&self, session: &PersistedEnrollment) -> Result<(), SessionStoreError> {
        *self.data.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.data.lock().unwrap() = None;
        *self.clears.lock().unwrap() += 1;
        Ok(())
    }
}

// ===== Clock, keys, navigator, events, browser =====

pub struct FakeClock(pub Mutex<DateTime<Utc>>);

impl FakeClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl ClockPort for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct FixedKeys(pub &'static str);

impl KeyGeneratorPort for FixedKeys {
    fn generate(&self) -> DeviceKeys {
        DeviceKeys {
            public: self.0.to_string(),
            private: SecretString::new("private-key"),
        }
    }
}

#[derive(Default)]
pub struct RecordingNavigator(pub Mutex<Vec<Route>>);

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl NavigatorPort for RecordingNavigator {
    async fn navigate(&self, route: Route) {
        self.0.lock().unwrap().push(route);
    }
}

#[derive(Default)]
pub struct RecordingEvents(pub Mutex<Vec<(WizardState, Option<StepIndicator>)>>);

#[async_trait]
impl EnrollmentEventPort for RecordingEvents {
    async fn emit_wizard_state_changed(&self, state: WizardState, indicator: Option<StepIndicator>) {
        self.0.lock().unwrap().push((state, indicator));
    }
}

#[derive(Default)]
pub struct RecordingBrowser(pub Mutex<Vec<String>>);

impl BrowserPort for RecordingBrowser {
    fn open(&self, url: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ===== MFA prompt =====

#[derive(Default)]
pub struct ScriptedPrompt {
    pub methods: Mutex<VecDeque<Option<MfaMethod>>>,
    pub codes: Mutex<VecDeque<Option<String>>>,
    pub retries: Mutex<VecDeque<RetryChoice>>,
    pub statuses: Mutex<Vec<MfaStatus>>,
    pub offered: Mutex<Vec<MfaError>>,
    pub qr: Mutex<Vec<QrPayload>>,
}

impl ScriptedPrompt {
    pub fn with_codes(codes: &[&str]) -> Self {
        let prompt = Self::default();
        *prompt.codes.lock().unwrap() = codes.iter().map(|c| Some(c.to_string())).collect();
        prompt
    }

    pub fn statuses(&self) -> Vec<MfaStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl MfaPromptPort for ScriptedPrompt {
    async fn choose_method(&self, _available: &[MfaMethod]) -> Option<MfaMethod> {
        self.methods.lock().unwrap().pop_front().flatten()
    }

    async fn request_code(&self, _method: MfaMethod) -> Option<String> {
        self.codes.lock().unwrap().pop_front().flatten()
    }

    async fn offer_retry(&self, error: &MfaError) -> RetryChoice {
        self.offered.lock().unwrap().push(error.clone());
        self.retries
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RetryChoice::Dismiss)
    }

    async fn show_qr(&self, payload: &QrPayload) {
        self.qr.lock().unwrap().push(payload.clone());
    }

    async fn report(&self, status: MfaStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}

// ===== Client MFA =====

type FinishFn =
    dyn Fn(&ClientMfaFinishRequest) -> Result<ClientMfaFinishResponse, ProxyApiError> + Send + Sync;

pub struct ScriptedMfaApi {
    pub starts: Mutex<VecDeque<Result<ClientMfaStartResponse, ProxyApiError>>>,
    pub start_calls: Mutex<Vec<ClientMfaStartRequest>>,
    pub finish_calls: Mutex<Vec<ClientMfaFinishRequest>>,
    finish: Box<FinishFn>,
}

impl ScriptedMfaApi {
    pub fn new<F>(finish: F) -> Self
    where
        F: Fn(&ClientMfaFinishRequest) -> Result<ClientMfaFinishResponse, ProxyApiError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            starts: Mutex::new(VecDeque::new()),
            start_calls: Mutex::new(Vec::new()),
            finish_calls: Mutex::new(Vec::new()),
            finish: Box::new(finish),
        }
    }

    pub fn push_start(&self, reply: Result<ClientMfaStartResponse, ProxyApiError>) {
        self.starts.lock().unwrap().push_back(reply);
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    pub fn finish_count(&self) -> usize {
        self.finish_calls.lock().unwrap().len()
    }
}

pub fn psk(key: &str) -> Result<ClientMfaFinishResponse, ProxyApiError> {
    Ok(ClientMfaFinishResponse {
        preshared_key: key.to_string(),
    })
}

pub fn status(status: u16, message: Option<&str>) -> ProxyApiError {
    ProxyApiError::Status {
        status,
        message: message.map(String::from),
    }
}

#[async_trait]
impl ClientMfaApiPort for ScriptedMfaApi {
    async fn start(
        &self,
        _proxy_url: &ProxyUrl,
        request: ClientMfaStartRequest,
    ) -> Result<ClientMfaStartResponse, ProxyApiError> {
        let n = {
            let mut calls = self.start_calls.lock().unwrap();
            calls.push(request);
            calls.len()
        };
        self.starts.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ClientMfaStartResponse {
                token: format!("tok-{n}"),
                challenge: Some("challenge".to_string()),
            })
        })
    }

    async fn finish(
        &self,
        _proxy_url: &ProxyUrl,
        request: ClientMfaFinishRequest,
    ) -> Result<ClientMfaFinishResponse, ProxyApiError> {
        let reply = (self.finish)(&request);
        self.finish_calls.lock().unwrap().push(request);
        reply
    }
}

/// Replays `frames`, then stays silent until closed.
pub struct ScriptedChannel {
    frames: VecDeque<RemoteMfaFrame>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl RemoteMfaChannel for ScriptedChannel {
    async fn next_frame(&mut self) -> Result<RemoteMfaFrame, ProxyApiError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeSocket {
    channels: Mutex<VecDeque<ScriptedChannel>>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeSocket {
    /// Queue a connection; the returned counter tracks its close calls.
    pub fn script(&self, frames: Vec<RemoteMfaFrame>) -> Arc<AtomicUsize> {
        let closes = Arc::new(AtomicUsize::new(0));
        self.channels.lock().unwrap().push_back(ScriptedChannel {
            frames: frames.into(),
            closes: Arc::clone(&closes),
        });
        closes
    }

    pub fn connection_count(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteMfaSocketPort for FakeSocket {
    async fn connect(
        &self,
        _proxy_url: &ProxyUrl,
        token: &str,
    ) -> Result<Box<dyn RemoteMfaChannel>, ProxyApiError> {
        self.tokens.lock().unwrap().push(token.to_string());
        let channel = self
            .channels
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProxyApiError::Transport("connection refused".into()))?;
        Ok(Box::new(channel))
    }
}

pub fn mfa_target() -> dg_core::MfaTarget {
    dg_core::MfaTarget {
        instance_id: InstanceId::from(INSTANCE_UUID),
        location_id: LocationId(1),
        pubkey: "existing-device-pubkey".into(),
        proxy_url: ProxyUrl::parse("https://vpn.example.com").unwrap(),
    }
}

// ===== Wiring =====

pub struct Harness {
    pub api: Arc<FakeEnrollmentApi>,
    pub native: Arc<FakeNative>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FakeClock>,
    pub navigator: Arc<RecordingNavigator>,
    pub events: Arc<RecordingEvents>,
    pub enrollment: Arc<EnrollmentOrchestrator>,
    pub reconciler: Arc<InstanceReconciler>,
}

impl Harness {
    pub fn new(api: FakeEnrollmentApi, instances: Vec<Instance>) -> Self {
        init_tracing();
        let api = Arc::new(api);
        let native = Arc::new(FakeNative::new(instances));
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(FakeClock::at(now()));
        let navigator = Arc::new(RecordingNavigator::default());
        let events = Arc::new(RecordingEvents::default());
        let keys = Arc::new(FixedKeys(DEVICE_PUBKEY));

        let enrollment = Arc::new(EnrollmentOrchestrator::new(EnrollmentDeps {
            api: api.clone(),
            store: store.clone(),
            native: native.clone(),
            keys: keys.clone(),
            clock: clock.clone(),
            navigator: navigator.clone(),
            events: events.clone(),
        }));
        let reconciler = Arc::new(InstanceReconciler::new(
            ReconcileDeps {
                api: api.clone(),
                native: native.clone(),
                keys,
                clock: clock.clone(),
                navigator: navigator.clone(),
            },
            Arc::clone(&enrollment),
            "laptop".to_string(),
        ));

        Self {
            api,
            native,
            store,
            clock,
            navigator,
            events,
            enrollment,
            reconciler,
        }
    }
}
