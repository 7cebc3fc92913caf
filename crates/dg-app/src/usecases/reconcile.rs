//! Instance reconciliation shared by every enrollment entry point.
//!
//! One entry token can mean three things: an instance this machine already
//! has, a user who is enrolled but needs a device here, or a brand new
//! enrollment. [`InstanceReconciler::reconcile`] decides which and acts.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use dg_core::enrollment::EnrollmentSession;
use dg_core::ports::{
    ClockPort, EnrollmentApiPort, KeyGeneratorPort, NativeBackendError, NativeBackendPort,
    NavigatorPort, ProxyAuth, SaveDeviceConfig,
};
use dg_core::proxy::{
    extract_proxy_cookie, server_messages, CreateDeviceRequest, EnrollmentStartResponse,
    NetworkInfoRequest, ProxyApiError,
};
use dg_core::{ErrorKind, Instance, InstanceId, ProxyUrl, ProxyUrlError, ReconcileOutcome, Route};

use crate::usecases::enrollment::{EnrollmentError, EnrollmentOrchestrator};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("url is required")]
    EmptyUrl,
    #[error("token is required")]
    EmptyToken,
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] ProxyUrlError),
    #[error("enrollment token expired")]
    TokenExpired,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response from proxy: {0}")]
    MalformedResponse(String),
    #[error("proxy did not issue a session cookie")]
    MissingCookie,
    #[error(transparent)]
    Backend(#[from] NativeBackendError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyUrl | Self::EmptyToken | Self::InvalidUrl(_) | Self::Rejected { .. } => {
                ErrorKind::TokenRejected
            }
            Self::TokenExpired => ErrorKind::SessionExpired,
            Self::Network(_) | Self::Backend(_) | Self::Enrollment(_) => ErrorKind::Network,
            Self::MalformedResponse(_) | Self::MissingCookie => ErrorKind::MalformedResponse,
        }
    }

    fn from_api(err: ProxyApiError) -> Self {
        match &err {
            ProxyApiError::Transport(message) => Self::Network(message.clone()),
            ProxyApiError::Malformed(message) => Self::MalformedResponse(message.clone()),
            ProxyApiError::Status { .. } if err.has_message(server_messages::TOKEN_EXPIRED) => {
                Self::TokenExpired
            }
            ProxyApiError::Status { status, message } => Self::Rejected {
                status: *status,
                message: message
                    .clone()
                    .unwrap_or_else(|| format!("proxy returned status {status}")),
            },
        }
    }
}

/// Ports the reconciler drives.
#[derive(Clone)]
pub struct ReconcileDeps {
    pub api: Arc<dyn EnrollmentApiPort>,
    pub native: Arc<dyn NativeBackendPort>,
    pub keys: Arc<dyn KeyGeneratorPort>,
    pub clock: Arc<dyn ClockPort>,
    pub navigator: Arc<dyn NavigatorPort>,
}

pub struct InstanceReconciler {
    deps: ReconcileDeps,
    enrollment: Arc<EnrollmentOrchestrator>,
    device_name: String,
}

impl InstanceReconciler {
    /// `device_name` names the device created for already-enrolled users.
    pub fn new(
        deps: ReconcileDeps,
        enrollment: Arc<EnrollmentOrchestrator>,
        device_name: String,
    ) -> Self {
        Self {
            deps,
            enrollment,
            device_name,
        }
    }

    pub async fn reconcile(&self, url: &str, token: &str) -> Result<ReconcileOutcome, ReconcileError> {
        let url = url.trim();
        let token = token.trim();
        if url.is_empty() {
            return Err(ReconcileError::EmptyUrl);
        }
        if token.is_empty() {
            return Err(ReconcileError::EmptyToken);
        }
        let proxy_url = ProxyUrl::parse(url)?;

        let span = info_span!("usecase.instance_reconciler.reconcile", proxy_url = %proxy_url);
        async {
            let reply = self
                .deps
                .api
                .start(
                    &proxy_url,
                    dg_core::proxy::EnrollmentStartRequest {
                        token: token.to_string(),
                    },
                )
                .await
                .map_err(|err| {
                    warn!(error = %err, "enrollment start rejected");
                    ReconcileError::from_api(err)
                })?;

            let cookie = extract_proxy_cookie(reply.set_cookies.iter().map(String::as_str))
                .ok_or(ReconcileError::MissingCookie)?;
            let auth = ProxyAuth {
                proxy_url: proxy_url.clone(),
                cookie,
            };
            let response = reply.body;

            let instances = self.deps.native.list_instances().await?;
            if let Some(existing) = instances
                .iter()
                .find(|instance| instance.is_same_instance(&response.instance))
            {
                return self.update_existing(&auth, existing).await;
            }

            if response.user.enrolled {
                return self.register_device(&auth, &response).await;
            }

            self.start_enrollment(auth, response).await
        }
        .instrument(span)
        .await
    }

    async fn update_existing(
        &self,
        auth: &ProxyAuth,
        existing: &Instance,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        info!(instance_id = %existing.id, "instance already known, refreshing config");
        let network_info = self
            .deps
            .api
            .network_info(
                auth,
                NetworkInfoRequest {
                    pubkey: existing.pubkey.clone(),
                },
            )
            .await
            .map_err(ReconcileError::from_api)?;
        self.deps
            .native
            .update_instance(&existing.id, network_info)
            .await?;
        self.deps
            .navigator
            .navigate(Route::ClientHome {
                selected_instance: Some(existing.id.clone()),
            })
            .await;
        Ok(ReconcileOutcome::InstanceUpdated {
            instance_id: existing.id.clone(),
        })
    }

    async fn register_device(
        &self,
        auth: &ProxyAuth,
        response: &EnrollmentStartResponse,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        info!(user = %response.user.login, "user already enrolled, registering device only");
        let keys = self.deps.keys.generate();
        let device = self
            .deps
            .api
            .create_device(
                auth,
                CreateDeviceRequest {
                    name: self.device_name.clone(),
                    pubkey: keys.public.clone(),
                },
            )
            .await
            .map_err(ReconcileError::from_api)?;
        if device.device.pubkey != keys.public {
            return Err(ReconcileError::MalformedResponse(
                "device public key mismatch".to_string(),
            ));
        }

        let instance = self
            .deps
            .native
            .save_device_config(SaveDeviceConfig {
                proxy_url: auth.proxy_url.clone(),
                keys,
                response: device,
            })
            .await?;
        let instance_id: InstanceId = instance.id;
        self.deps
            .navigator
            .navigate(Route::ClientHome {
                selected_instance: Some(instance_id.clone()),
            })
            .await;
        Ok(ReconcileOutcome::DeviceRegistered { instance_id })
    }

    async fn start_enrollment(
        &self,
        auth: ProxyAuth,
        response: EnrollmentStartResponse,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let session =
            EnrollmentSession::from_start(auth.proxy_url, auth.cookie, response, self.deps.clock.now());
        self.enrollment.begin(session).await?;
        self.deps.navigator.navigate(Route::Enrollment).await;
        Ok(ReconcileOutcome::EnrollmentStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_errors_are_classified() {
        let expired = ReconcileError::from_api(ProxyApiError::Status {
            status: 401,
            message: Some("token expired".into()),
        });
        assert!(matches!(expired, ReconcileError::TokenExpired));
        assert_eq!(expired.kind(), ErrorKind::SessionExpired);

        let generic = ReconcileError::from_api(ProxyApiError::Status {
            status: 400,
            message: Some("enrollment token invalid".into()),
        });
        assert_eq!(generic.to_string(), "enrollment token invalid");
        assert_eq!(generic.kind(), ErrorKind::TokenRejected);

        let offline = ReconcileError::from_api(ProxyApiError::Transport("refused".into()));
        assert_eq!(offline.kind(), ErrorKind::Network);
    }
}
