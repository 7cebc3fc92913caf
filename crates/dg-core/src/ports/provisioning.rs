use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Enrollment request dropped on the machine by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProvisioningRequest {
    pub enrollment_url: String,
    pub enrollment_token: String,
}

#[async_trait]
pub trait ProvisioningSourcePort: Send + Sync {
    /// Current provisioning request, if one is present.
    async fn read(&self) -> anyhow::Result<Option<ProvisioningRequest>>;
}
