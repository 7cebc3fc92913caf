//! Provisioning file dropped on the machine by an administrator.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use dg_core::ports::{ProvisioningRequest, ProvisioningSourcePort};

pub const DEFAULT_PROVISIONING_FILE: &str = "provisioning.json";

pub struct FileProvisioningSource {
    path: PathBuf,
}

impl FileProvisioningSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProvisioningSourcePort for FileProvisioningSource {
    async fn read(&self) -> anyhow::Result<Option<ProvisioningRequest>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("read provisioning file failed: {}", self.path.display())
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        let request: ProvisioningRequest = serde_json::from_str(&content)
            .with_context(|| format!("parse provisioning file failed: {}", self.path.display()))?;
        debug!(url = %request.enrollment_url, "provisioning request found");
        Ok(Some(request))
    }
}
