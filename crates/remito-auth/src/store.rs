//! File-backed account registry.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use remito_core::error::{CredentialStoreError, Error};
use remito_core::{AccessToken, AccountId, CredentialRecord, CredentialStore, RefreshToken, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk shape of one credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    account: String,
    access_token: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
    scopes: Vec<String>,
}

/// On-disk shape of the registry file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Registry {
    #[serde(default)]
    accounts: HashMap<String, StoredRecord>,
    #[serde(default)]
    last_used: Option<String>,
}

/// JSON registry of credential records, one file per installation.
///
/// The path is injected by the caller; tests point it at a temp directory.
/// Writes go to a temp file and are renamed into place, so a concurrent
/// reader never observes a torn record; read-modify-write cycles hold an
/// advisory lock, and the last writer wins across processes.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store backed by the given registry file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Read the registry. A missing file is an empty registry; an unreadable
    /// or malformed one is logged and also treated as empty, forcing
    /// re-consent instead of crashing.
    fn read_registry(&self) -> Registry {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Registry::default(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Credential file unreadable, treating as empty");
                return Registry::default();
            }
        };

        match serde_json::from_str(&data) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Credential file corrupted, treating as empty");
                Registry::default()
            }
        }
    }

    fn write_registry(&self, registry: &Registry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let json = serde_json::to_string_pretty(registry).map_err(|e| {
            Error::CredentialStore(CredentialStoreError::Io {
                message: e.to_string(),
            })
        })?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &json).map_err(map_io)?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&temp_path).map_err(map_io)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms).map_err(map_io)?;
        }

        fs::rename(&temp_path, &self.path).map_err(map_io)?;
        Ok(())
    }

    /// Run a read-modify-write cycle under the advisory lock.
    fn with_registry_mut(&self, f: impl FnOnce(&mut Registry)) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())
            .map_err(map_io)?;
        lock_file.lock_exclusive().map_err(map_io)?;

        let mut registry = self.read_registry();
        f(&mut registry);
        let result = self.write_registry(&registry);

        let _ = fs2::FileExt::unlock(&lock_file);
        result
    }
}

fn map_io(err: std::io::Error) -> Error {
    Error::CredentialStore(CredentialStoreError::Io {
        message: err.to_string(),
    })
}

fn to_record(stored: &StoredRecord) -> Option<CredentialRecord> {
    let account = match AccountId::new(&stored.account) {
        Ok(account) => account,
        Err(err) => {
            warn!(error = %err, "Skipping stored record with invalid account id");
            return None;
        }
    };

    Some(CredentialRecord {
        account,
        access_token: AccessToken::new(stored.access_token.clone()),
        refresh_token: stored.refresh_token.clone().map(RefreshToken::new),
        expires_at: stored.expires_at,
        scopes: stored.scopes.clone(),
    })
}

fn to_stored(record: &CredentialRecord) -> StoredRecord {
    StoredRecord {
        account: record.account.as_str().to_string(),
        access_token: record.access_token.as_str().to_string(),
        refresh_token: record.refresh_token.as_ref().map(|t| t.as_str().to_string()),
        expires_at: record.expires_at,
        scopes: record.scopes.clone(),
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, account: &AccountId) -> Result<Option<CredentialRecord>> {
        let registry = self.read_registry();
        Ok(registry.accounts.get(account.as_str()).and_then(to_record))
    }

    #[instrument(skip(self, record), fields(account = %record.account))]
    async fn save(&self, record: &CredentialRecord) -> Result<()> {
        debug!("Persisting credential record");
        self.with_registry_mut(|registry| {
            registry
                .accounts
                .insert(record.account.as_str().to_string(), to_stored(record));
        })
    }

    #[instrument(skip(self), fields(account = %account))]
    async fn remove(&self, account: &AccountId) -> Result<()> {
        debug!("Removing credential record");
        self.with_registry_mut(|registry| {
            registry.accounts.remove(account.as_str());
            if registry.last_used.as_deref() == Some(account.as_str()) {
                registry.last_used = None;
            }
        })
    }

    async fn accounts(&self) -> Result<Vec<AccountId>> {
        let registry = self.read_registry();
        Ok(registry
            .accounts
            .keys()
            .filter_map(|id| AccountId::new(id).ok())
            .collect())
    }

    async fn last_used(&self) -> Result<Option<AccountId>> {
        let registry = self.read_registry();
        Ok(registry
            .last_used
            .as_deref()
            .and_then(|id| AccountId::new(id).ok()))
    }

    async fn set_last_used(&self, account: &AccountId) -> Result<()> {
        self.with_registry_mut(|registry| {
            registry.last_used = Some(account.as_str().to_string());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(email: &str) -> CredentialRecord {
        CredentialRecord {
            account: AccountId::new(email).unwrap(),
            access_token: AccessToken::new("access-value"),
            refresh_token: Some(RefreshToken::new("refresh-value")),
            expires_at: Utc::now() + Duration::hours(1),
            scopes: vec!["https://www.googleapis.com/auth/spreadsheets".to_string()],
        }
    }

    fn temp_store() -> (tempfile::TempDir, FileCredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("credentials.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let (_dir, store) = temp_store();
        let rec = record("alice@example.com");

        store.save(&rec).await.unwrap();
        let loaded = store.load(&rec.account).await.unwrap().unwrap();

        assert_eq!(loaded.account, rec.account);
        assert_eq!(loaded.access_token.as_str(), "access-value");
        assert_eq!(
            loaded.refresh_token.as_ref().map(|t| t.as_str()),
            Some("refresh-value")
        );
        assert_eq!(loaded.expires_at, rec.expires_at);
    }

    #[tokio::test]
    async fn load_missing_account_is_none() {
        let (_dir, store) = temp_store();
        let account = AccountId::new("nobody@example.com").unwrap();
        assert!(store.load(&account).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_file_reads_as_empty() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{ this is not json").unwrap();

        let account = AccountId::new("alice@example.com").unwrap();
        assert!(store.load(&account).await.unwrap().is_none());
        assert!(store.accounts().await.unwrap().is_empty());

        // And a save over the corrupt file recovers it.
        store.save(&record("alice@example.com")).await.unwrap();
        assert!(store.load(&account).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn remove_clears_record_and_last_used() {
        let (_dir, store) = temp_store();
        let rec = record("alice@example.com");

        store.save(&rec).await.unwrap();
        store.set_last_used(&rec.account).await.unwrap();
        store.remove(&rec.account).await.unwrap();

        assert!(store.load(&rec.account).await.unwrap().is_none());
        assert!(store.last_used().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn saving_one_account_leaves_others_untouched() {
        let (_dir, store) = temp_store();
        let alice = record("alice@example.com");
        let bob = record("bob@example.com");

        store.save(&alice).await.unwrap();
        let before = fs::read_to_string(store.path()).unwrap();
        let alice_json: serde_json::Value = serde_json::from_str(&before).unwrap();

        store.save(&bob).await.unwrap();

        let after = fs::read_to_string(store.path()).unwrap();
        let both: serde_json::Value = serde_json::from_str(&after).unwrap();
        assert_eq!(
            both["accounts"]["alice@example.com"],
            alice_json["accounts"]["alice@example.com"]
        );
        assert!(both["accounts"]["bob@example.com"].is_object());
    }

    #[tokio::test]
    async fn last_used_round_trip() {
        let (_dir, store) = temp_store();
        let rec = record("alice@example.com");

        assert!(store.last_used().await.unwrap().is_none());
        store.save(&rec).await.unwrap();
        store.set_last_used(&rec.account).await.unwrap();
        assert_eq!(store.last_used().await.unwrap(), Some(rec.account));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn registry_file_is_owner_only() {
        let (_dir, store) = temp_store();
        store.save(&record("alice@example.com")).await.unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
