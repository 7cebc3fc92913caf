//! # dg-core
//!
//! Core domain models and business rules for the defguard desktop client:
//! the enrollment wizard, MFA challenge model, instance model and the
//! proxy wire contract.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

pub mod config;
pub mod deep_link;
pub mod enrollment;
pub mod error_kind;
pub mod ids;
pub mod instance;
pub mod mfa;
pub mod navigation;
pub mod ports;
pub mod proxy;
pub mod proxy_url;
pub mod secret;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use deep_link::{DeepLink, DeepLinkError};
pub use error_kind::ErrorKind;
pub use ids::{InstanceId, LocationId};
pub use instance::{Instance, Location, ReconcileOutcome};
pub use mfa::{MfaError, MfaMethod, MfaOutcome, MfaTarget, PresharedKey};
pub use navigation::Route;
pub use proxy_url::{ProxyUrl, ProxyUrlError};
pub use secret::SecretString;
