//! File-backed enrollment session store.
//!
//! One JSON file per application session (`enrollment-{scope}.json`), so a
//! session left behind by a previous run is never resumed.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use dg_core::enrollment::{PersistedEnrollment, SessionEnvelope, SESSION_SCHEMA_VERSION};
use dg_core::ports::{EnrollmentSessionStorePort, SessionStoreError};

const FILE_PREFIX: &str = "enrollment-";
const FILE_SUFFIX: &str = ".json";

pub struct FileSessionStore {
    dir: PathBuf,
    scope: String,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, scope: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            scope: scope.into(),
        }
    }

    /// Store scoped to a fresh random id (one per process start).
    pub fn with_new_scope(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, uuid::Uuid::new_v4().to_string())
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn path(&self) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", self.scope))
    }

    /// Delete session files written under any other scope.
    pub async fn prune_other_scopes(&self) -> anyhow::Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("read session dir failed: {}", self.dir.display()))
            }
        };

        let own = self.path();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == own || !is_session_file(&path) {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(err) => warn!(path = %path.display(), error = %err, "failed to prune session file"),
            }
        }
        if removed > 0 {
            info!(removed, "pruned enrollment sessions from previous runs");
        }
        Ok(removed)
    }

    async fn atomic_write(&self, content: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create session dir failed: {}", self.dir.display()))?;

        let path = self.path();
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp session failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path).await.with_context(|| {
            format!(
                "rename temp session failed: {} -> {}",
                tmp_path.display(),
                path.display()
            )
        })?;
        Ok(())
    }
}

fn is_session_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX))
}

fn io_error(err: anyhow::Error) -> SessionStoreError {
    SessionStoreError::Io(format!("{err:#}"))
}

#[async_trait]
impl EnrollmentSessionStorePort for FileSessionStore {
    async fn load(&self) -> Result<Option<PersistedEnrollment>, SessionStoreError> {
        let path = self.path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionStoreError::Io(err.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| SessionStoreError::Corrupt(e.to_string()))?;
        let version = value.get("version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(SESSION_SCHEMA_VERSION)) {
            warn!(found = ?version, expected = SESSION_SCHEMA_VERSION, "discarding session with other schema version");
            return Ok(None);
        }

        let envelope: SessionEnvelope = serde_json::from_value(value)
            .map_err(|e| SessionStoreError::Corrupt(e.to_string()))?;
        debug!(step = ?envelope.data.step, "enrollment session loaded");
        Ok(Some(envelope.data))
    }

    async fn save(&self, session: &PersistedEnrollment) -> Result<(), SessionStoreError> {
        let json = serde_json::to_string_pretty(&SessionEnvelope::wrap(session.clone()))
            .map_err(|e| SessionStoreError::Corrupt(e.to_string()))?;
        self.atomic_write(&json).await.map_err(io_error)
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(self.path()).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionStoreError::Io(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dg_core::enrollment::{EnrollmentStep, StepFlags};
    use dg_core::proxy::{AdminInfo, InstanceInfo, UserInfo};
    use dg_core::{ProxyUrl, SecretString};
    use tempfile::TempDir;

    fn persisted() -> PersistedEnrollment {
        PersistedEnrollment {
            step: EnrollmentStep::Device,
            proxy_url: ProxyUrl::parse("https://vpn.example.com").unwrap(),
            cookie: "defguard_proxy=abc".into(),
            user_info: UserInfo {
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                login: "jdoe".into(),
                email: "jane@example.com".into(),
                phone_number: None,
                is_active: false,
                enrolled: false,
                device_names: vec![],
            },
            admin_info: AdminInfo {
                name: "Admin".into(),
                phone_number: None,
                email: "admin@example.com".into(),
            },
            instance: InstanceInfo {
                id: "2f1c6f0e-3f36-4d6e-9a53-4a3b5d1f7c11".into(),
                name: "Example".into(),
                url: "https://core.example.com".into(),
                proxy_url: "https://vpn.example.com".into(),
                username: "jdoe".into(),
            },
            flags: StepFlags {
                vpn_optional: false,
                mfa_required: true,
                mfa_skippable: false,
            },
            phone_number: None,
            user_password: Some(SecretString::new("Str0ng!pass")),
            mfa_method: None,
            recovery_codes: None,
            mfa_registered: false,
            device_response: None,
            device_committed: false,
            final_page_content: String::new(),
            session_start: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single(),
            session_end: Utc.with_ymd_and_hms(2026, 3, 1, 13, 0, 0).single(),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "run-1");

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn saved_session_is_loaded_back() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "run-1");

        store.save(&persisted()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(persisted()));
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn other_scope_does_not_see_the_session() {
        let dir = TempDir::new().unwrap();
        FileSessionStore::new(dir.path(), "run-1")
            .save(&persisted())
            .await
            .unwrap();

        let next_run = FileSessionStore::new(dir.path(), "run-2");
        assert_eq!(next_run.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn version_mismatch_discards_data() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "run-1");
        let mut envelope = serde_json::to_value(SessionEnvelope::wrap(persisted())).unwrap();
        envelope["version"] = serde_json::json!(SESSION_SCHEMA_VERSION + 1);
        fs::write(store.path(), envelope.to_string()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn garbage_is_reported_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "run-1");
        fs::write(store.path(), "{not json").await.unwrap();

        assert!(matches!(
            store.load().await,
            Err(SessionStoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path(), "run-1");
        store.save(&persisted()).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn prune_removes_only_foreign_session_files() {
        let dir = TempDir::new().unwrap();
        FileSessionStore::new(dir.path(), "old-1")
            .save(&persisted())
            .await
            .unwrap();
        FileSessionStore::new(dir.path(), "old-2")
            .save(&persisted())
            .await
            .unwrap();
        fs::write(dir.path().join("instances.json"), "[]").await.unwrap();
        let current = FileSessionStore::new(dir.path(), "current");
        current.save(&persisted()).await.unwrap();

        let removed = current.prune_other_scopes().await.unwrap();

        assert_eq!(removed, 2);
        assert!(dir.path().join("instances.json").exists());
        assert!(current.load().await.unwrap().is_some());
    }
}
