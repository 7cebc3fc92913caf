//! Enrollment orchestrator.
//!
//! Runs the pure enrollment state machine, executes its actions against the
//! ports and feeds the results back as events.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use dg_core::enrollment::{
    EnrollmentSession, EnrollmentStateMachine, NavigationIntent, StepError,
    StepIndicator, WizardAction, WizardEvent, WizardState,
};
use dg_core::ports::{
    ClockPort, EnrollmentApiPort, EnrollmentEventPort, EnrollmentSessionStorePort,
    KeyGeneratorPort, NativeBackendPort, NavigatorPort, ProxyAuth, SaveDeviceConfig,
};
use dg_core::proxy::{
    ActivateUserRequest, CreateDeviceRequest, RegisterMfaFinishRequest, RegisterMfaStartRequest,
};
use dg_core::{ErrorKind, Route};

use super::context::EnrollmentContext;
use super::error::{step_error_from, EnrollmentError};

/// Ports the enrollment orchestrator drives.
#[derive(Clone)]
pub struct EnrollmentDeps {
    pub api: Arc<dyn EnrollmentApiPort>,
    pub store: Arc<dyn EnrollmentSessionStorePort>,
    pub native: Arc<dyn NativeBackendPort>,
    pub keys: Arc<dyn KeyGeneratorPort>,
    pub clock: Arc<dyn ClockPort>,
    pub navigator: Arc<dyn NavigatorPort>,
    pub events: Arc<dyn EnrollmentEventPort>,
}

/// Orchestrator that drives the enrollment wizard and its side effects.
pub struct EnrollmentOrchestrator {
    context: Arc<EnrollmentContext>,
    deps: EnrollmentDeps,
}

impl EnrollmentOrchestrator {
    pub fn new(deps: EnrollmentDeps) -> Self {
        Self {
            context: EnrollmentContext::new().arc(),
            deps,
        }
    }

    /// Start a fresh session (called by the reconciler).
    pub async fn begin(&self, session: EnrollmentSession) -> Result<WizardState, EnrollmentError> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;

        self.deps.store.save(&session.to_persisted()).await?;
        info!(instance = %session.instance.name, "enrollment session started");
        self.context.install(session).await;
        let state = self.context.state().await;
        self.emit(state.clone()).await;
        Ok(state)
    }

    /// Restore a session persisted earlier in this application session.
    ///
    /// Returns `None` when there is nothing to resume.
    pub async fn resume(&self) -> Result<Option<WizardState>, EnrollmentError> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;

        let Some(persisted) = self.deps.store.load().await? else {
            return Ok(None);
        };
        let session = EnrollmentSession::from_persisted(persisted);
        debug!(step = ?session.step, "resuming enrollment session");
        let expired = session.clock().is_expired(self.deps.clock.now());
        self.context.install(session).await;

        if expired {
            return self.run(WizardEvent::DeadlineElapsed).await.map(Some);
        }
        let state = self.context.state().await;
        self.emit(state.clone()).await;
        Ok(Some(state))
    }

    pub async fn navigate(&self, intent: NavigationIntent) -> Result<WizardState, EnrollmentError> {
        self.dispatch(WizardEvent::Navigate(intent)).await
    }

    pub async fn dispatch(&self, event: WizardEvent) -> Result<WizardState, EnrollmentError> {
        // Serializes the whole transition + actions + store update.
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.run(event).await
    }

    pub async fn state(&self) -> WizardState {
        self.context.state().await
    }

    /// Snapshot of the session for rendering (profile data, TOTP secret,
    /// recovery codes while they are shown).
    pub async fn session(&self) -> Option<EnrollmentSession> {
        self.context.session().await
    }

    pub async fn indicator(&self) -> Option<StepIndicator> {
        let step = self.context.state().await.step()?;
        let visible = self.context.visible_steps().await?;
        Some(visible.indicator(step))
    }

    pub async fn can_retreat(&self) -> bool {
        let Some(step) = self.context.state().await.step() else {
            return false;
        };
        self.context
            .session()
            .await
            .map(|s| s.context().can_retreat(step))
            .unwrap_or(false)
    }

    /// Arm the deadline timer for the mounted wizard.
    ///
    /// The timer is recomputed on every mount and disarmed when the guard drops.
    pub async fn mount(self: &Arc<Self>) -> DeadlineGuard {
        let remaining = self
            .context
            .session()
            .await
            .map(|s| s.clock().remaining(self.deps.clock.now()))
            .unwrap_or_default();
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(remaining).await;
            let Some(orchestrator) = weak.upgrade() else {
                return;
            };
            if orchestrator.state().await.is_terminal() {
                return;
            }
            info!("enrollment session deadline reached");
            if let Err(err) = orchestrator.dispatch(WizardEvent::DeadlineElapsed).await {
                warn!(error = %err, "failed to expire enrollment session");
            }
        });
        DeadlineGuard { handle }
    }

    /// Throw away the session, e.g. when the user abandons the wizard.
    pub async fn reset(&self) -> Result<(), EnrollmentError> {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        self.deps.store.clear().await?;
        self.context.reset(WizardState::Completed).await;
        Ok(())
    }

    async fn run(&self, event: WizardEvent) -> Result<WizardState, EnrollmentError> {
        let span = info_span!("usecase.enrollment_orchestrator.dispatch", event = ?event);
        async {
            let mut current = self.context.state().await;
            let mut pending_events = vec![event];

            while let Some(event) = pending_events.pop() {
                let Some(session) = self.context.session().await else {
                    if current.is_terminal() {
                        return Ok(current);
                    }
                    return Err(EnrollmentError::NoSession);
                };
                let event = if !current.is_terminal()
                    && session.clock().is_expired(self.deps.clock.now())
                {
                    WizardEvent::DeadlineElapsed
                } else {
                    event
                };

                let from = current.clone();
                let event_name = format!("{:?}", event);
                let (next, actions) =
                    EnrollmentStateMachine::transition(current, event, &session.context());
                info!(from = ?from, to = ?next, event = %event_name, "enrollment state transition");

                self.context.set_state(next.clone()).await;
                let follow_up_events = self.execute_actions(actions).await;
                if !next.is_terminal() {
                    self.persist().await;
                }
                current = self.context.state().await;
                self.emit(current.clone()).await;
                pending_events.extend(follow_up_events);
            }

            Ok(current)
        }
        .instrument(span)
        .await
    }

    async fn execute_actions(&self, actions: Vec<WizardAction>) -> Vec<WizardEvent> {
        let mut follow_up_events = Vec::new();
        for action in actions {
            let name = action.name();
            debug!(action = name, "enrollment executing action");
            let result = match action {
                WizardAction::StoreContact { phone_number } => {
                    self.context
                        .update_session(|s| s.phone_number = phone_number)
                        .await;
                    Ok(None)
                }
                WizardAction::StorePassword { password } => {
                    self.context
                        .update_session(|s| s.user_password = Some(password))
                        .await;
                    Ok(None)
                }
                WizardAction::CreateDevice { name } => self.create_device(name).await,
                WizardAction::StartMfaRegistration { method } => {
                    self.start_mfa_registration(method).await
                }
                WizardAction::FinishMfaRegistration { code } => {
                    self.finish_mfa_registration(code).await
                }
                WizardAction::ConsumeRecoveryCodes => {
                    self.context
                        .update_session(|s| {
                            s.take_recovery_codes();
                            s.totp_secret = None;
                        })
                        .await;
                    Ok(None)
                }
                WizardAction::ActivateUser => self.activate_user().await,
                WizardAction::CompleteEnrollment => {
                    self.complete().await;
                    Ok(None)
                }
                WizardAction::ExpireSession => {
                    self.expire().await;
                    Ok(None)
                }
            };

            match result {
                Ok(Some(event)) => follow_up_events.push(event),
                Ok(None) => {}
                Err(error) => {
                    warn!(action = name, error = %error, "enrollment action failed");
                    follow_up_events.push(WizardEvent::ActionFailed { error });
                    break;
                }
            }
        }
        follow_up_events
    }

    async fn auth(&self) -> Result<ProxyAuth, StepError> {
        self.context
            .session()
            .await
            .map(|s| ProxyAuth {
                proxy_url: s.proxy_url,
                cookie: s.cookie,
            })
            .ok_or_else(|| StepError::request(ErrorKind::SessionExpired, "no enrollment session"))
    }

    async fn create_device(&self, name: String) -> Result<Option<WizardEvent>, StepError> {
        let auth = self.auth().await?;
        let keys = self.deps.keys.generate();
        self.context
            .update_session(|s| s.device_keys = Some(keys.clone()))
            .await;

        let response = self
            .deps
            .api
            .create_device(
                &auth,
                CreateDeviceRequest {
                    name,
                    pubkey: keys.public.clone(),
                },
            )
            .await
            .map_err(|err| step_error_from(&err))?;

        if response.device.pubkey != keys.public {
            error!(
                submitted = %keys.public,
                returned = %response.device.pubkey,
                "proxy returned a device with a different public key"
            );
            return Err(StepError::request(
                ErrorKind::MalformedResponse,
                "proxy returned a device with a different public key",
            ));
        }

        let instance = self
            .deps
            .native
            .save_device_config(SaveDeviceConfig {
                proxy_url: auth.proxy_url,
                keys,
                response: response.clone(),
            })
            .await
            .map_err(|err| {
                StepError::request(ErrorKind::Network, format!("saving device failed: {err}"))
            })?;
        info!(instance_id = %instance.id, device = %response.device.name, "device saved");

        self.context
            .update_session(|s| {
                s.device_response = Some(response);
                // Keys are held only until the backend has them.
                s.device_keys = None;
                s.device_committed = true;
            })
            .await;
        Ok(Some(WizardEvent::DeviceCreated))
    }

    async fn start_mfa_registration(
        &self,
        method: dg_core::MfaMethod,
    ) -> Result<Option<WizardEvent>, StepError> {
        let auth = self.auth().await?;
        let response = self
            .deps
            .api
            .register_mfa_start(&auth, RegisterMfaStartRequest { method })
            .await
            .map_err(|err| step_error_from(&err))?;
        self.context
            .update_session(|s| {
                s.mfa_method = Some(method);
                if response.totp_secret.is_some() {
                    s.totp_secret = response.totp_secret;
                }
            })
            .await;
        Ok(Some(WizardEvent::MfaRegistrationStarted))
    }

    async fn finish_mfa_registration(&self, code: String) -> Result<Option<WizardEvent>, StepError> {
        let auth = self.auth().await?;
        let method = self
            .context
            .session()
            .await
            .and_then(|s| s.mfa_method)
            .ok_or_else(|| StepError::request(ErrorKind::MalformedResponse, "no mfa method chosen"))?;

        let response = self
            .deps
            .api
            .register_mfa_finish(&auth, RegisterMfaFinishRequest { code, method })
            .await
            .map_err(|err| match step_error_from(&err) {
                StepError::Request {
                    kind: ErrorKind::TokenRejected,
                    ..
                } => StepError::request(ErrorKind::TokenRejected, "invalid code"),
                other => other,
            })?;

        self.context
            .update_session(|s| {
                s.recovery_codes = Some(response.recovery_codes);
                s.mfa_registered = true;
            })
            .await;
        Ok(Some(WizardEvent::MfaRegistered))
    }

    async fn activate_user(&self) -> Result<Option<WizardEvent>, StepError> {
        let auth = self.auth().await?;
        let session = self.context.session().await;
        let (password, phone_number) = session
            .map(|s| (s.user_password, s.phone_number))
            .unwrap_or_default();
        let password = password.ok_or(StepError::PasswordEmpty)?;

        self.deps
            .api
            .activate_user(
                &auth,
                ActivateUserRequest {
                    phone_number,
                    password: password.expose().to_string(),
                },
            )
            .await
            .map_err(|err| step_error_from(&err))?;

        self.context.update_session(|s| s.user_password = None).await;
        info!("user activated");
        Ok(Some(WizardEvent::Activated))
    }

    async fn complete(&self) {
        let selected_instance = self
            .context
            .session()
            .await
            .filter(|s| s.device_committed)
            .map(|s| dg_core::InstanceId::from(s.instance.id));
        self.clear_store().await;
        self.context.reset(WizardState::Completed).await;
        self.deps
            .navigator
            .navigate(Route::ClientHome { selected_instance })
            .await;
    }

    async fn expire(&self) {
        self.clear_store().await;
        self.context.reset(WizardState::Expired).await;
        self.deps.navigator.navigate(Route::SessionExpired).await;
    }

    async fn clear_store(&self) {
        if let Err(err) = self.deps.store.clear().await {
            warn!(error = %err, "failed to clear enrollment session");
        }
    }

    async fn persist(&self) {
        let Some(session) = self.context.session().await else {
            return;
        };
        if let Err(err) = self.deps.store.save(&session.to_persisted()).await {
            warn!(error = %err, "failed to persist enrollment session");
        }
    }

    async fn emit(&self, state: WizardState) {
        let indicator = match state.step() {
            Some(step) => self
                .context
                .visible_steps()
                .await
                .map(|visible| visible.indicator(step)),
            None => None,
        };
        self.deps
            .events
            .emit_wizard_state_changed(state, indicator)
            .await;
    }
}

/// Keeps the deadline timer armed; aborts it on drop (unmount).
pub struct DeadlineGuard {
    handle: JoinHandle<()>,
}

impl DeadlineGuard {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
