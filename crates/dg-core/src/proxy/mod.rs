//! Wire contract of the enrollment/MFA proxy.
//!
//! Request and response bodies exchanged with the proxy, the proxy error
//! model, and session-cookie extraction.

pub mod client_mfa;
pub mod cookie;
pub mod enrollment;
pub mod error;

pub use client_mfa::{
    ClientMfaFinishRequest, ClientMfaFinishResponse, ClientMfaStartRequest,
    ClientMfaStartResponse, RemoteMfaMessage, RemoteMfaMessageError,
};
pub use cookie::{extract_proxy_cookie, PROXY_COOKIE_NAME};
pub use enrollment::{
    ActivateUserRequest, AdminInfo, CreateDeviceRequest, DeviceConfig, DeviceInfo,
    DeviceResponse, EnrollmentSettings, EnrollmentStartReply, EnrollmentStartRequest,
    EnrollmentStartResponse, InstanceInfo, NetworkInfoRequest, RegisterMfaFinishRequest,
    RegisterMfaFinishResponse, RegisterMfaStartRequest, RegisterMfaStartResponse, UserInfo,
};
pub use error::{server_messages, ProxyApiError};
