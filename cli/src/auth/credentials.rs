//! Refresh-token persistence.
//!
//! The refresh token survives between runs as a small JSON document in the
//! user's data directory. The file is created with owner-only permissions
//! on Unix.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths;
use crate::error::{HubError, Result};

/// What is kept on disk between runs.
///
/// The client and token endpoint that issued the refresh token are kept
/// alongside it when they were given at login, since a refresh must go to
/// the same place.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub refresh_token: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl StoredCredentials {
    #[must_use]
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            saved_at: Utc::now(),
            client_id: None,
            client_secret: None,
            token_url: None,
        }
    }
}

impl std::fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("refresh_token", &"[redacted]")
            .field("saved_at", &self.saved_at)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// File-backed refresh-token storage.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at the default location, `<data_dir>/hubstats/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Config`] if the data directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::at(paths::credentials_file()?))
    }

    /// Store at an explicit path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves `stored`, replacing anything stored before.
    pub fn save(&self, stored: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(stored)?;
        std::fs::write(&self.path, json)?;
        restrict_permissions(&self.path)?;

        tracing::debug!(path = %self.path.display(), "Saved refresh token");
        Ok(())
    }

    /// Loads the stored credentials. Returns `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidCredentials`] if the file cannot be parsed.
    pub fn load(&self) -> Result<Option<StoredCredentials>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let stored: StoredCredentials =
            serde_json::from_str(&json).map_err(|_| HubError::InvalidCredentials)?;
        Ok(Some(stored))
    }

    /// Removes stored credentials. No-op if nothing is stored.
    pub fn delete(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::at(dir.path().join("nested").join("credentials.json"));
        (dir, store)
    }

    #[test]
    fn load_without_file_is_none() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_none());
        assert!(!store.has_credentials());
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = store();
        store.save(&StoredCredentials::new("1//refresh")).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.refresh_token, "1//refresh");
        assert!(store.has_credentials());
    }

    #[test]
    fn save_overwrites() {
        let (_dir, store) = store();
        store.save(&StoredCredentials::new("old")).unwrap();
        store.save(&StoredCredentials::new("new")).unwrap();

        assert_eq!(store.load().unwrap().unwrap().refresh_token, "new");
    }

    #[test]
    fn corrupted_file_is_invalid_credentials() {
        let (_dir, store) = store();
        store.save(&StoredCredentials::new("R1")).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load(), Err(HubError::InvalidCredentials)));
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, store) = store();
        store.save(&StoredCredentials::new("R1")).unwrap();

        store.delete().unwrap();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        store.save(&StoredCredentials::new("R1")).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn debug_output_hides_token() {
        let mut stored = StoredCredentials::new("secret-refresh");
        stored.client_secret = Some("secret-client".to_string());

        let debug = format!("{stored:?}");
        assert!(!debug.contains("secret-refresh"));
        assert!(!debug.contains("secret-client"));
    }

    #[test]
    fn login_endpoint_is_kept_with_the_token() {
        let (_dir, store) = store();
        let mut stored = StoredCredentials::new("R1");
        stored.client_id = Some("ghe-app".to_string());
        stored.token_url = Some("https://ghe.example.com/login/oauth/access_token".to_string());
        store.save(&stored).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.client_id.as_deref(), Some("ghe-app"));
        assert_eq!(
            loaded.token_url.as_deref(),
            Some("https://ghe.example.com/login/oauth/access_token")
        );
        assert!(loaded.client_secret.is_none());
    }

    #[test]
    fn file_without_login_endpoint_still_loads() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"refresh_token":"R1","saved_at":"2024-01-15T10:00:00Z"}"#,
        )
        .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.refresh_token, "R1");
        assert!(loaded.client_id.is_none());
        assert!(loaded.token_url.is_none());
    }
}
