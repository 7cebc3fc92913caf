use async_trait::async_trait;

use crate::proxy::{
    ClientMfaFinishRequest, ClientMfaFinishResponse, ClientMfaStartRequest,
    ClientMfaStartResponse, ProxyApiError,
};
use crate::proxy_url::ProxyUrl;

/// Connection-time MFA endpoints of the proxy.
#[async_trait]
pub trait ClientMfaApiPort: Send + Sync {
    async fn start(
        &self,
        proxy_url: &ProxyUrl,
        request: ClientMfaStartRequest,
    ) -> Result<ClientMfaStartResponse, ProxyApiError>;

    /// HTTP 428 from this call means "not authorized yet" while polling.
    async fn finish(
        &self,
        proxy_url: &ProxyUrl,
        request: ClientMfaFinishRequest,
    ) -> Result<ClientMfaFinishResponse, ProxyApiError>;
}
