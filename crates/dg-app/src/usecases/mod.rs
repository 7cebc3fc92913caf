//! Business logic use cases.
//!
//! All entry points converge on [`InstanceReconciler::reconcile`]; the
//! enrollment wizard and the MFA dialog are long-lived orchestrators.

pub mod connect_location;
pub mod enrollment;
pub mod entry;
pub mod mfa;
pub mod reconcile;

pub use connect_location::{spawn_mfa_prompt_listener, ConnectError, ConnectLocation, ConnectOutcome};
pub use enrollment::{
    DeadlineGuard, EnrollmentDeps, EnrollmentError, EnrollmentOrchestrator, NavigationQueue,
};
pub use entry::{DeepLinkHandler, ManualEntry, ProvisioningWatcher};
pub use mfa::{MfaOrchestrator, MfaSettings};
pub use reconcile::{InstanceReconciler, ReconcileDeps, ReconcileError};
