//! Persistent per-bridge credential store.
//!
//! Credentials live in `~/.huesync/credentials.json` as a map from bridge
//! id to `{ "username": <application key>, "clientkey": <hex PSK> }`. The
//! directory is created `0700` and the file written `0600` — the client
//! key is the streaming channel's authentication secret.
//!
//! A file that is missing, unreadable, or malformed loads as "no
//! credentials": the orchestrator then simply re-pairs, which rewrites the
//! file. Mutations are whole-file read-modify-write; the single-threaded
//! orchestrator is the only writer.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::PathBuf;

use directories::UserDirs;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CoreError;

const CREDENTIALS_DIR: &str = ".huesync";
const CREDENTIALS_FILE: &str = "credentials.json";

/// API credentials for one paired bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCredentials {
    /// REST bearer identifier, sent as the `hue-application-key` header.
    #[serde(rename = "username")]
    pub application_key: String,
    /// Hex-encoded 128-bit pre-shared key for the streaming channel.
    #[serde(rename = "clientkey")]
    pub client_key: String,
}

/// Store keyed by bridge id, backed by a single JSON file.
///
/// The directory is an explicit field so tests can point the store at a
/// temporary location instead of the caller's home.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Store under `<home>/.huesync`.
    pub fn new() -> Result<Self, CoreError> {
        let dirs = UserDirs::new().ok_or_else(|| {
            CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "home directory not found",
            ))
        })?;
        Ok(Self {
            dir: dirs.home_dir().join(CREDENTIALS_DIR),
        })
    }

    /// Store under an explicit directory (test override).
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIALS_FILE)
    }

    /// Load the credentials for `bridge_id`, if any.
    ///
    /// All failure modes — no file, unreadable file, corrupt JSON, unknown
    /// bridge — are `None`: the caller re-pairs rather than dying on state
    /// it can regenerate.
    pub fn load(&self, bridge_id: &str) -> Option<BridgeCredentials> {
        self.read_all().remove(bridge_id)
    }

    /// Persist the credentials for `bridge_id`, preserving other entries.
    pub fn save(&self, bridge_id: &str, creds: &BridgeCredentials) -> Result<(), CoreError> {
        let mut all = self.read_all();
        all.insert(bridge_id.to_string(), creds.clone());
        self.write_all(&all)
    }

    /// Remove the entry for `bridge_id`. A missing file or entry is fine.
    pub fn delete(&self, bridge_id: &str) -> Result<(), CoreError> {
        if !self.path().exists() {
            return Ok(());
        }
        let mut all = self.read_all();
        all.remove(bridge_id);
        self.write_all(&all)
    }

    fn read_all(&self) -> BTreeMap<String, BridgeCredentials> {
        let data = match fs::read(self.path()) {
            Ok(data) => data,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_slice(&data) {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "credentials file is malformed; treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn write_all(&self, all: &BTreeMap<String, BridgeCredentials>) -> Result<(), CoreError> {
        if !self.dir.exists() {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(&self.dir)?;
        }

        let path = self.path();
        let data = serde_json::to_vec_pretty(all).expect("credential map serializes");
        fs::write(&path, data)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::with_dir(tmp.path().join("creds"));
        (tmp, store)
    }

    fn creds(n: u32) -> BridgeCredentials {
        BridgeCredentials {
            application_key: format!("user{n}"),
            client_key: format!("key{n}"),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let (_tmp, store) = store();

        store.save("bridge-1", &creds(1)).unwrap();
        assert_eq!(store.load("bridge-1"), Some(creds(1)));
    }

    #[test]
    fn load_missing_file_is_none() {
        let (_tmp, store) = store();
        assert_eq!(store.load("bridge-1"), None);
    }

    #[test]
    fn load_unknown_bridge_is_none() {
        let (_tmp, store) = store();
        store.save("bridge-1", &creds(1)).unwrap();
        assert_eq!(store.load("bridge-other"), None);
    }

    #[test]
    fn load_malformed_file_is_none() {
        let (_tmp, store) = store();
        fs::create_dir_all(store.dir.clone()).unwrap();
        fs::write(store.path(), b"{ not json").unwrap();
        assert_eq!(store.load("bridge-1"), None);
    }

    #[test]
    fn delete_removes_entry() {
        let (_tmp, store) = store();
        store.save("bridge-1", &creds(1)).unwrap();
        store.delete("bridge-1").unwrap();
        assert_eq!(store.load("bridge-1"), None);
    }

    #[test]
    fn delete_without_file_is_ok() {
        let (_tmp, store) = store();
        store.delete("bridge-1").unwrap();
    }

    #[test]
    fn other_bridges_preserved_across_save_and_delete() {
        let (_tmp, store) = store();

        store.save("bridge-1", &creds(1)).unwrap();
        store.save("bridge-2", &creds(2)).unwrap();
        assert_eq!(store.load("bridge-1"), Some(creds(1)));
        assert_eq!(store.load("bridge-2"), Some(creds(2)));

        store.delete("bridge-1").unwrap();
        assert_eq!(store.load("bridge-1"), None);
        assert_eq!(store.load("bridge-2"), Some(creds(2)));
    }

    #[test]
    fn save_creates_dir_and_sets_permissions() {
        let (_tmp, store) = store();
        store.save("b1", &creds(1)).unwrap();

        let dir_mode = fs::metadata(&store.dir).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);

        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn file_uses_wire_field_names() {
        let (_tmp, store) = store();
        store
            .save(
                "b1",
                &BridgeCredentials {
                    application_key: "app".into(),
                    client_key: "abcd".into(),
                },
            )
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"username\": \"app\""));
        assert!(raw.contains("\"clientkey\": \"abcd\""));
    }
}
