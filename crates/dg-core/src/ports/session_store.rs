use async_trait::async_trait;
use thiserror::Error;

use crate::enrollment::PersistedEnrollment;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store io failed: {0}")]
    Io(String),

    #[error("session data corrupt: {0}")]
    Corrupt(String),
}

/// Session-scoped persistence of the enrollment session.
///
/// Data written in one application session is invisible to the next one.
#[async_trait]
pub trait EnrollmentSessionStorePort: Send + Sync {
    /// Load the stored session. Data written under another schema version
    /// is discarded and reported as `None`.
    async fn load(&self) -> Result<Option<PersistedEnrollment>, SessionStoreError>;

    async fn save(&self, session: &PersistedEnrollment) -> Result<(), SessionStoreError>;

    async fn clear(&self) -> Result<(), SessionStoreError>;
}
