//! defguard client application layer
//!
//! This crate contains the enrollment and MFA use cases and their runtime
//! orchestration: the wizard runtime, the MFA challenge orchestrator, the
//! instance reconciler and the three enrollment entry points.

pub mod usecases;

pub use usecases::{
    ConnectLocation, DeepLinkHandler, EnrollmentDeps, EnrollmentOrchestrator, InstanceReconciler,
    ManualEntry, MfaOrchestrator, MfaSettings, NavigationQueue, ProvisioningWatcher,
};
