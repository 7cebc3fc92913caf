//! MFA challenge orchestrator.
//!
//! Negotiates one of four challenge protocols with the proxy and yields the
//! preshared key for a single connection. It never connects by itself and
//! never touches the enrollment session or the instance list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use dg_core::ids::{InstanceId, LocationId};
use dg_core::mfa::{
    is_valid_code, MfaChallenge, MfaError, MfaMethod, MfaOutcome, MfaStatus, MfaTarget,
    PresharedKey, QrPayload,
};
use dg_core::ports::{
    BrowserPort, ClientMfaApiPort, MfaPromptPort, RemoteMfaFrame, RemoteMfaSocketPort, RetryChoice,
};
use dg_core::proxy::{ClientMfaFinishRequest, ClientMfaStartRequest, RemoteMfaMessage};

use super::poll::{poll_until, PollOutcome, PollStep};
use super::remote::RemoteMfaConnection;

/// Methods offered when the location does not dictate one.
pub const CLIENT_MFA_METHODS: [MfaMethod; 4] = [
    MfaMethod::Totp,
    MfaMethod::Email,
    MfaMethod::OpenId,
    MfaMethod::MobileApprove,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MfaSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for MfaSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(5 * 60),
        }
    }
}

type AttemptKey = (InstanceId, LocationId);

pub struct MfaOrchestrator {
    api: Arc<dyn ClientMfaApiPort>,
    socket: Arc<dyn RemoteMfaSocketPort>,
    browser: Arc<dyn BrowserPort>,
    prompt: Arc<dyn MfaPromptPort>,
    settings: MfaSettings,
    attempts: Arc<Mutex<HashMap<AttemptKey, (u64, CancellationToken)>>>,
    next_attempt: AtomicU64,
}

impl MfaOrchestrator {
    pub fn new(
        api: Arc<dyn ClientMfaApiPort>,
        socket: Arc<dyn RemoteMfaSocketPort>,
        browser: Arc<dyn BrowserPort>,
        prompt: Arc<dyn MfaPromptPort>,
        settings: MfaSettings,
    ) -> Self {
        Self {
            api,
            socket,
            browser,
            prompt,
            settings,
            attempts: Arc::new(Mutex::new(HashMap::new())),
            next_attempt: AtomicU64::new(1),
        }
    }

    /// Run the MFA dialog for `target` until a key is issued, the user gives
    /// up after an error, or the attempt is cancelled.
    ///
    /// Starting a new attempt for the same target cancels the previous one.
    pub async fn authorize(
        &self,
        target: MfaTarget,
        preferred: Option<MfaMethod>,
    ) -> Result<MfaOutcome, MfaError> {
        let attempt = self.register(&target);
        let span = info_span!(
            "usecase.mfa_orchestrator.authorize",
            instance_id = %target.instance_id,
            location_id = %target.location_id,
        );

        async {
            let mut preferred = preferred;
            loop {
                let method = match preferred.take() {
                    Some(method) => method,
                    None => {
                        let chosen = tokio::select! {
                            biased;
                            _ = attempt.token.cancelled() => None,
                            chosen = self.prompt.choose_method(&CLIENT_MFA_METHODS) => chosen,
                        };
                        match chosen {
                            Some(method) => method,
                            None => return Ok(self.cancelled().await),
                        }
                    }
                };

                match self.run_until_settled(&target, method, &attempt.token).await {
                    MethodResult::Outcome(outcome) => return Ok(outcome),
                    MethodResult::ChangeMethod => continue,
                    MethodResult::Failed(err) => return Err(err),
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Cancel the pending attempt for `target` (dialog closed).
    pub fn cancel(&self, target: &MfaTarget) {
        let removed = self
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&target.key());
        if let Some((_, token)) = removed {
            debug!(instance_id = %target.instance_id, location_id = %target.location_id, "mfa attempt cancelled");
            token.cancel();
        }
    }

    pub fn has_pending_attempt(&self, target: &MfaTarget) -> bool {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&target.key())
    }

    fn register(&self, target: &MfaTarget) -> Attempt {
        let id = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self
            .attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.key(), (id, token.clone()));
        if let Some((_, previous)) = previous {
            debug!("replacing pending mfa attempt for the same location");
            previous.cancel();
        }
        Attempt {
            id,
            key: target.key(),
            token,
            registry: Arc::clone(&self.attempts),
        }
    }

    /// Run `method`, offering retries on failure, until it settles.
    async fn run_until_settled(
        &self,
        target: &MfaTarget,
        method: MfaMethod,
        cancel: &CancellationToken,
    ) -> MethodResult {
        loop {
            self.prompt.report(MfaStatus::Starting(method)).await;
            let result = match method {
                MfaMethod::Totp | MfaMethod::Email => self.code_flow(target, method, cancel).await,
                MfaMethod::OpenId => self.openid_flow(target, cancel).await,
                MfaMethod::MobileApprove => self.mobile_flow(target, cancel).await,
            };

            let err = match result {
                Ok(MfaOutcome::Authorized(key)) => {
                    info!(method = %method, "mfa authorized");
                    self.prompt.report(MfaStatus::Authorized).await;
                    return MethodResult::Outcome(MfaOutcome::Authorized(key));
                }
                Ok(MfaOutcome::Cancelled) => {
                    return MethodResult::Outcome(self.cancelled().await);
                }
                Err(err) => err,
            };

            warn!(method = %method, error = %err, kind = ?err.kind(), "mfa attempt failed");
            self.prompt.report(MfaStatus::Failed(err.clone())).await;
            if err.requires_restart() {
                return MethodResult::ChangeMethod;
            }

            let choice = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                choice = self.prompt.offer_retry(&err) => Some(choice),
            };
            match choice {
                None => return MethodResult::Outcome(self.cancelled().await),
                Some(RetryChoice::Retry) => continue,
                Some(RetryChoice::ChangeMethod) => return MethodResult::ChangeMethod,
                Some(RetryChoice::Dismiss) => return MethodResult::Failed(err),
            }
        }
    }

    async fn cancelled(&self) -> MfaOutcome {
        self.prompt.report(MfaStatus::Cancelled).await;
        MfaOutcome::Cancelled
    }

    async fn start(&self, target: &MfaTarget, method: MfaMethod) -> Result<MfaChallenge, MfaError> {
        let response = self
            .api
            .start(
                &target.proxy_url,
                ClientMfaStartRequest {
                    method,
                    pubkey: target.pubkey.clone(),
                    location_id: target.location_id,
                },
            )
            .await
            .map_err(|err| {
                warn!(method = %method, error = %err, "client mfa start failed");
                MfaError::classify_start(method, &err)
            })?;
        Ok(MfaChallenge::issued(method, response))
    }

    async fn code_flow(
        &self,
        target: &MfaTarget,
        method: MfaMethod,
        cancel: &CancellationToken,
    ) -> Result<MfaOutcome, MfaError> {
        let challenge = self.start(target, method).await?;
        self.prompt.report(MfaStatus::AwaitingCode(method)).await;

        loop {
            let code = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                code = self.prompt.request_code(method) => code,
            };
            let Some(code) = code else {
                return Ok(MfaOutcome::Cancelled);
            };
            let code = code.trim().to_string();
            if !is_valid_code(&code) {
                self.prompt.report(MfaStatus::Failed(MfaError::InvalidCode)).await;
                continue;
            }

            let finished = self
                .api
                .finish(
                    &target.proxy_url,
                    ClientMfaFinishRequest {
                        token: challenge.token.clone(),
                        code: Some(code),
                    },
                )
                .await;
            match finished {
                Ok(response) => {
                    return Ok(MfaOutcome::Authorized(PresharedKey::new(
                        response.preshared_key,
                    )))
                }
                Err(err) => {
                    let err = MfaError::classify_finish(&err);
                    if !err.is_retryable_in_place() {
                        return Err(err);
                    }
                    // Same token, new code.
                    self.prompt.report(MfaStatus::Failed(err)).await;
                }
            }
        }
    }

    async fn openid_flow(
        &self,
        target: &MfaTarget,
        cancel: &CancellationToken,
    ) -> Result<MfaOutcome, MfaError> {
        let challenge = self.start(target, MfaMethod::OpenId).await?;
        let url = target.proxy_url.openid_mfa_url(&challenge.token);
        if let Err(err) = self.browser.open(&url) {
            warn!(error = %err, "failed to open browser for openid mfa");
        }
        self.prompt
            .report(MfaStatus::AwaitingBrowser { url: url.clone() })
            .await;

        let token = challenge.token;
        let outcome = poll_until(
            self.settings.poll_interval,
            self.settings.poll_timeout,
            cancel,
            || {
                let request = ClientMfaFinishRequest {
                    token: token.clone(),
                    code: None,
                };
                async move {
                    match self.api.finish(&target.proxy_url, request).await {
                        Ok(response) => PollStep::Done(PresharedKey::new(response.preshared_key)),
                        Err(err) if err.is_precondition_required() => PollStep::Pending,
                        Err(err) => PollStep::Failed(MfaError::classify_poll(&err)),
                    }
                }
            },
        )
        .await;

        match outcome {
            PollOutcome::Done(key) => Ok(MfaOutcome::Authorized(key)),
            PollOutcome::Failed(err) => Err(err),
            PollOutcome::TimedOut => Err(MfaError::Timeout),
            PollOutcome::Cancelled => Ok(MfaOutcome::Cancelled),
        }
    }

    async fn mobile_flow(
        &self,
        target: &MfaTarget,
        cancel: &CancellationToken,
    ) -> Result<MfaOutcome, MfaError> {
        let challenge = self.start(target, MfaMethod::MobileApprove).await?;
        let secret = challenge.mobile_secret().inspect_err(|_| {
            warn!("mobile approval start returned no challenge");
        })?;
        let qr = QrPayload::encode(&challenge.token, secret, &target.instance_id);
        self.prompt.show_qr(&qr).await;
        self.prompt.report(MfaStatus::AwaitingMobile).await;

        let channel = self
            .socket
            .connect(&target.proxy_url, &challenge.token)
            .await
            .map_err(|err| MfaError::Network(err.to_string()))?;
        let mut conn = RemoteMfaConnection::new(channel);

        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                frame = conn.next_frame() => Some(frame),
            };

            match frame {
                None => {
                    conn.cancel().await;
                    return Ok(MfaOutcome::Cancelled);
                }
                Some(RemoteMfaFrame::Text(text)) => match RemoteMfaMessage::parse(&text) {
                    Ok(message) => {
                        conn.close().await;
                        return Ok(MfaOutcome::Authorized(PresharedKey::new(
                            message.preshared_key,
                        )));
                    }
                    Err(err) => {
                        warn!(error = %err, "malformed remote mfa message");
                        self.prompt
                            .report(MfaStatus::Failed(MfaError::UnknownResponse))
                            .await;
                    }
                },
                Some(RemoteMfaFrame::Closed) => {
                    return match conn.unexpected_close() {
                        Some(err) => Err(err),
                        None => Ok(MfaOutcome::Cancelled),
                    };
                }
            }
        }
    }
}

enum MethodResult {
    Outcome(MfaOutcome),
    ChangeMethod,
    Failed(MfaError),
}

/// Registry entry for one running attempt; removed when the attempt ends
/// unless a newer attempt replaced it.
struct Attempt {
    id: u64,
    key: AttemptKey,
    token: CancellationToken,
    registry: Arc<Mutex<HashMap<AttemptKey, (u64, CancellationToken)>>>,
}

impl Drop for Attempt {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            registry.remove(&self.key);
        }
    }
}
