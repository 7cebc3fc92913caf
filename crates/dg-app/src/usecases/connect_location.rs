//! Connect a location, running MFA first when the location requires it.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use dg_core::ids::{InstanceId, LocationId};
use dg_core::mfa::{MfaError, MfaOutcome, MfaTarget};
use dg_core::ports::{NativeBackendError, NativeBackendPort, NativeEvent};

use crate::usecases::mfa::MfaOrchestrator;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("unknown instance {0}")]
    UnknownInstance(InstanceId),
    #[error("unknown location {0}")]
    UnknownLocation(LocationId),
    #[error("mfa failed: {0}")]
    Mfa(#[from] MfaError),
    #[error(transparent)]
    Backend(#[from] NativeBackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// The user closed the MFA dialog.
    Cancelled,
}

pub struct ConnectLocation {
    native: Arc<dyn NativeBackendPort>,
    mfa: Arc<MfaOrchestrator>,
}

impl ConnectLocation {
    pub fn new(native: Arc<dyn NativeBackendPort>, mfa: Arc<MfaOrchestrator>) -> Self {
        Self { native, mfa }
    }

    pub async fn execute(
        &self,
        instance_id: &InstanceId,
        location_id: LocationId,
    ) -> Result<ConnectOutcome, ConnectError> {
        let span = info_span!(
            "usecase.connect_location.execute",
            instance_id = %instance_id,
            location_id = %location_id,
        );
        async {
            let instances = self.native.list_instances().await?;
            let instance = instances
                .into_iter()
                .find(|i| &i.id == instance_id)
                .ok_or_else(|| ConnectError::UnknownInstance(instance_id.clone()))?;
            let location = instance
                .location(location_id)
                .cloned()
                .ok_or(ConnectError::UnknownLocation(location_id))?;

            let Some(method) = location.mfa_method else {
                self.native.connect(instance_id, location_id, None).await?;
                info!("location connected");
                return Ok(ConnectOutcome::Connected);
            };

            let target = MfaTarget {
                instance_id: instance.id.clone(),
                location_id,
                pubkey: instance.pubkey.clone(),
                proxy_url: instance.proxy_url.clone(),
            };
            match self.mfa.authorize(target, Some(method)).await? {
                MfaOutcome::Authorized(key) => {
                    // The key authorizes exactly one connection attempt.
                    self.native
                        .connect(instance_id, location_id, Some(key))
                        .await?;
                    info!("location connected after mfa");
                    Ok(ConnectOutcome::Connected)
                }
                MfaOutcome::Cancelled => Ok(ConnectOutcome::Cancelled),
            }
        }
        .instrument(span)
        .await
    }
}

/// React to the native backend asking for MFA by running [`ConnectLocation`].
pub fn spawn_mfa_prompt_listener(
    native: Arc<dyn NativeBackendPort>,
    connect: Arc<ConnectLocation>,
) -> JoinHandle<()> {
    let mut events = native.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(NativeEvent::MfaRequested {
                    instance_id,
                    location_id,
                }) => {
                    let connect = Arc::clone(&connect);
                    tokio::spawn(async move {
                        if let Err(err) = connect.execute(&instance_id, location_id).await {
                            warn!(error = %err, "mfa requested by backend failed");
                        }
                    });
                }
                Ok(NativeEvent::ConnectionChanged { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "native event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
