//! The three ways an enrollment can begin. All of them end in
//! [`InstanceReconciler::reconcile`](crate::usecases::InstanceReconciler::reconcile).

mod deep_link;
mod manual;
mod provisioning;

pub use deep_link::DeepLinkHandler;
pub use manual::ManualEntry;
pub use provisioning::ProvisioningWatcher;
