//! WebSocket adapter for mobile-approval MFA.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use dg_core::ports::{RemoteMfaChannel, RemoteMfaFrame, RemoteMfaSocketPort};
use dg_core::proxy::ProxyApiError;
use dg_core::ProxyUrl;

const REMOTE_MFA_PATH: &str = "client-mfa/remote";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Build `{proxy-as-ws}/api/v1/client-mfa/remote?token=...`.
pub fn remote_mfa_url(proxy_url: &ProxyUrl, token: &str) -> Result<String, ProxyApiError> {
    let mut url = reqwest::Url::parse(&proxy_url.websocket_url(REMOTE_MFA_PATH))
        .map_err(|e| ProxyApiError::Malformed(e.to_string()))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TungsteniteRemoteMfaSocket;

#[async_trait]
impl RemoteMfaSocketPort for TungsteniteRemoteMfaSocket {
    async fn connect(
        &self,
        proxy_url: &ProxyUrl,
        token: &str,
    ) -> Result<Box<dyn RemoteMfaChannel>, ProxyApiError> {
        let url = remote_mfa_url(proxy_url, token)?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ProxyApiError::Transport(e.to_string()))?;
        info!(proxy_url = %proxy_url, "remote mfa socket connected");
        Ok(Box::new(TungsteniteChannel { stream }))
    }
}

struct TungsteniteChannel {
    stream: WsStream,
}

#[async_trait]
impl RemoteMfaChannel for TungsteniteChannel {
    async fn next_frame(&mut self) -> Result<RemoteMfaFrame, ProxyApiError> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(RemoteMfaFrame::Closed),
                Some(Err(e)) => return Err(ProxyApiError::Transport(e.to_string())),
                Some(Ok(message)) => message,
            };
            match message {
                Message::Text(text) => return Ok(RemoteMfaFrame::Text(text.to_string())),
                Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(RemoteMfaFrame::Text(text)),
                    Err(_) => debug!(len = bytes.len(), "ignoring non-utf8 binary frame"),
                },
                Message::Close(frame) => {
                    debug!(frame = ?frame, "remote mfa socket closed by peer");
                    return Ok(RemoteMfaFrame::Closed);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!(error = %err, "remote mfa socket close failed");
        }
    }
}
