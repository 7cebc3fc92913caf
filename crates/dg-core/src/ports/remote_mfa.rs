use async_trait::async_trait;

use crate::proxy::ProxyApiError;
use crate::proxy_url::ProxyUrl;

/// What the remote-approval socket produced next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMfaFrame {
    Text(String),
    /// The peer closed the connection or the stream ended.
    Closed,
}

/// An open remote-approval connection.
#[async_trait]
pub trait RemoteMfaChannel: Send {
    async fn next_frame(&mut self) -> Result<RemoteMfaFrame, ProxyApiError>;

    /// Close from our side. Safe to call more than once.
    async fn close(&mut self);
}

#[async_trait]
pub trait RemoteMfaSocketPort: Send + Sync {
    /// Open `{proxy-as-ws}/api/v1/client-mfa/remote?token={token}`.
    async fn connect(
        &self,
        proxy_url: &ProxyUrl,
        token: &str,
    ) -> Result<Box<dyn RemoteMfaChannel>, ProxyApiError>;
}
