//! Lifecycle of one remote-approval socket.

use tracing::{debug, warn};

use dg_core::mfa::MfaError;
use dg_core::ports::{RemoteMfaChannel, RemoteMfaFrame};

/// Owns a remote-approval channel for one attempt.
///
/// Closing is idempotent. Once the user cancelled, the socket going away
/// is expected and is not reported; an unexpected close is reported once.
pub struct RemoteMfaConnection {
    channel: Box<dyn RemoteMfaChannel>,
    closed: bool,
    user_cancelled: bool,
    close_reported: bool,
}

impl RemoteMfaConnection {
    pub fn new(channel: Box<dyn RemoteMfaChannel>) -> Self {
        Self {
            channel,
            closed: false,
            user_cancelled: false,
            close_reported: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next frame, or `Closed` once the connection is gone.
    pub async fn next_frame(&mut self) -> RemoteMfaFrame {
        if self.closed {
            return RemoteMfaFrame::Closed;
        }
        match self.channel.next_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "remote mfa socket failed");
                RemoteMfaFrame::Closed
            }
        }
    }

    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.channel.close().await;
        debug!("remote mfa socket closed");
    }

    /// Close on behalf of the user (dialog closed, attempt replaced).
    pub async fn cancel(&mut self) {
        self.user_cancelled = true;
        self.close().await;
    }

    /// Error to report for the peer going away, at most once and never
    /// after a user cancel.
    pub fn unexpected_close(&mut self) -> Option<MfaError> {
        self.closed = true;
        if self.user_cancelled || self.close_reported {
            return None;
        }
        self.close_reported = true;
        Some(MfaError::ConnectionClosed)
    }
}
