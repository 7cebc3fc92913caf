use async_trait::async_trait;

use crate::proxy::{
    ActivateUserRequest, CreateDeviceRequest, DeviceResponse, EnrollmentStartReply,
    EnrollmentStartRequest, NetworkInfoRequest, ProxyApiError, RegisterMfaFinishRequest,
    RegisterMfaFinishResponse, RegisterMfaStartRequest, RegisterMfaStartResponse,
};
use crate::proxy_url::ProxyUrl;

/// Credentials for calls following `enrollment/start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub proxy_url: ProxyUrl,
    /// Full `defguard_proxy=...` pair, sent as the `Cookie` header.
    pub cookie: String,
}

/// Enrollment endpoints of the proxy.
#[async_trait]
pub trait EnrollmentApiPort: Send + Sync {
    /// `POST {base}/api/v1/enrollment/start`. Returns the body together
    /// with every `Set-Cookie` header value.
    async fn start(
        &self,
        proxy_url: &ProxyUrl,
        request: EnrollmentStartRequest,
    ) -> Result<EnrollmentStartReply, ProxyApiError>;

    async fn create_device(
        &self,
        auth: &ProxyAuth,
        request: CreateDeviceRequest,
    ) -> Result<DeviceResponse, ProxyApiError>;

    async fn activate_user(
        &self,
        auth: &ProxyAuth,
        request: ActivateUserRequest,
    ) -> Result<(), ProxyApiError>;

    async fn network_info(
        &self,
        auth: &ProxyAuth,
        request: NetworkInfoRequest,
    ) -> Result<DeviceResponse, ProxyApiError>;

    async fn register_mfa_start(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaStartRequest,
    ) -> Result<RegisterMfaStartResponse, ProxyApiError>;

    async fn register_mfa_finish(
        &self,
        auth: &ProxyAuth,
        request: RegisterMfaFinishRequest,
    ) -> Result<RegisterMfaFinishResponse, ProxyApiError>;
}
