//! Host bootstrap: configuration, tracing and dependency wiring.

pub mod config;
pub mod device_name;
pub mod tracing;
pub mod wiring;

pub use config::{load_config, load_for_host, resolve, ResolvedConfig};
pub use wiring::{wire, ClientApp, UiPorts, WiringError};
