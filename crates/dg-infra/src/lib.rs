//! # dg-infra
//!
//! Adapters for the ports declared in `dg-core`: the reqwest proxy client,
//! the websocket approval channel, file-backed session and instance storage,
//! key generation, clock and browser.

pub mod browser;
pub mod fs;
pub mod native;
pub mod proxy;
pub mod security;
pub mod time;

pub use browser::SystemBrowser;
pub use fs::{FileProvisioningSource, FileSessionStore};
pub use native::FileNativeBackend;
pub use proxy::{ReqwestProxyClient, TungsteniteRemoteMfaSocket, DEFAULT_HTTP_TIMEOUT};
pub use security::WireguardKeyGenerator;
pub use time::SystemClock;
