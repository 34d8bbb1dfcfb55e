//! File-backed credential storage.
//!
//! Each credential key is stored as one JSON file inside the auth directory,
//! mirroring the backend's multi-file auth state layout. Writes are awaited
//! so a crash cannot drop freshly issued credentials.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::error::GatewayError;
use crate::gateway::{CredentialStore, Credentials};

/// Credential store writing one `{key}.json` file per credential.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Whether a previously persisted session exists.
    pub fn has_session(&self) -> bool {
        self.dir.join("creds.json").exists()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys may contain path-hostile characters (e.g. ":" in sync keys)
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn persist(&self, credentials: &Credentials) -> Result<(), GatewayError> {
        let to_err = |source: std::io::Error| GatewayError::CredentialPersist {
            key: credentials.key.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(to_err)?;

        let payload = serde_json::to_vec_pretty(&credentials.data).map_err(|e| {
            to_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let path = self.path_for(&credentials.key);
        tokio::fs::write(&path, payload).await.map_err(to_err)?;

        tracing::debug!("Persisted credentials '{}' to {}", credentials.key, path.display());
        Ok(())
    }
}

#[allow(dead_code)]
pub fn store_path(dir: &Path, key: &str) -> PathBuf {
    FileCredentialStore::new(dir).path_for(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (FileCredentialStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "statuscaster-auth-test-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ));
        (FileCredentialStore::new(&dir), dir)
    }

    #[test]
    fn test_key_sanitization() {
        let store = FileCredentialStore::new("/tmp/auth");
        let path = store.path_for("app-state-sync-key:AAAA/bb");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "app-state-sync-key-AAAA-bb.json");
    }

    #[tokio::test]
    async fn test_persist_writes_file() {
        let (store, dir) = temp_store();
        let creds = Credentials {
            key: "creds".to_string(),
            data: serde_json::json!({ "session": "abc123" }),
        };

        store.persist(&creds).await.unwrap();
        assert!(store.has_session());

        let written = tokio::fs::read_to_string(dir.join("creds.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["session"], "abc123");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_persist_overwrites_previous() {
        let (store, dir) = temp_store();
        let first = Credentials {
            key: "creds".to_string(),
            data: serde_json::json!({ "version": 1 }),
        };
        let second = Credentials {
            key: "creds".to_string(),
            data: serde_json::json!({ "version": 2 }),
        };

        store.persist(&first).await.unwrap();
        store.persist(&second).await.unwrap();

        let written = tokio::fs::read_to_string(dir.join("creds.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["version"], 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
