//! Network adapters for the proxy: JSON over HTTP and the approval socket.

pub mod client;
pub mod remote_socket;

pub use client::{ReqwestProxyClient, DEFAULT_HTTP_TIMEOUT};
pub use remote_socket::TungsteniteRemoteMfaSocket;
