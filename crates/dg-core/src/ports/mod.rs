//! Port interfaces for the application layer
//!
//! Ports define the contract between the use cases and infrastructure
//! implementations (HTTP proxy client, websocket, storage, the native
//! tunnel backend, the host UI).

mod browser;
mod client_mfa_api;
mod clock;
mod enrollment_api;
mod enrollment_event;
mod keys;
mod mfa_prompt;
mod native_backend;
mod navigator;
mod provisioning;
mod remote_mfa;
mod session_store;

pub use browser::BrowserPort;
pub use client_mfa_api::ClientMfaApiPort;
pub use clock::ClockPort;
pub use enrollment_api::{EnrollmentApiPort, ProxyAuth};
pub use enrollment_event::EnrollmentEventPort;
pub use keys::KeyGeneratorPort;
pub use mfa_prompt::{MfaPromptPort, RetryChoice};
pub use native_backend::{NativeBackendError, NativeBackendPort, NativeEvent, SaveDeviceConfig};
pub use navigator::NavigatorPort;
pub use provisioning::{ProvisioningRequest, ProvisioningSourcePort};
pub use remote_mfa::{RemoteMfaChannel, RemoteMfaFrame, RemoteMfaSocketPort};
pub use session_store::{EnrollmentSessionStorePort, SessionStoreError};
