use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use journal_storage_core::StorageError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::store::DeviceStore;

const RECORD_EXTENSION: &str = "json";

/// Longest hex-encoded key used directly as a file stem.
const MAX_HEX_STEM_LEN: usize = 200;

const DIGEST_PREFIX: &str = "sha256-";

/// Body of a digest-named record: the key cannot be recovered from the file name.
#[derive(Serialize, Deserialize)]
struct DigestRecord {
    key: String,
    value: String,
}

/// Directory-backed device store.
///
/// Layout:
/// ```text
/// {root}/
///   {hex(key)}.json             # record text, keys up to 100 bytes
///   sha256-{hex(sha256(key))}.json  # {"key", "value"} envelope, longer keys
///   *.json.tmp                  # in-flight write, renamed over the record
/// ```
/// File names stay well below the usual 255-byte limit for any key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::Io(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;
        debug!("Opened file store at {}", root.display());
        Ok(Self { root })
    }

    /// Default storage directory under the platform's local data directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("journal-storage")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let mut stem = hex::encode(key);
        if stem.len() > MAX_HEX_STEM_LEN {
            stem = format!("{}{}", DIGEST_PREFIX, hex::encode(Sha256::digest(key.as_bytes())));
        }
        self.root.join(format!("{}.{}", stem, RECORD_EXTENSION))
    }

    fn is_digest_path(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == RECORD_EXTENSION)
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(DIGEST_PREFIX))
    }

    fn decode_file_name(path: &Path) -> Option<String> {
        if path.extension()? != RECORD_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    fn read_digest_record(path: &Path) -> Option<DigestRecord> {
        let text = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Unreadable record {}, treating as absent: {}", path.display(), e);
                None
            }
        }
    }
}

impl DeviceStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.record_path(key);
        if Self::is_digest_path(&path) {
            if !path.exists() {
                return Ok(None);
            }
            return Ok(Self::read_digest_record(&path).map(|record| record.value));
        }

        match fs::read(&path) {
            // Invalid UTF-8 is passed through lossily and rejected by the JSON layer.
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.record_path(key);
        let temp_path = path.with_extension("json.tmp");

        let body = if Self::is_digest_path(&path) {
            serde_json::to_string(&DigestRecord {
                key: key.to_string(),
                value: value.to_string(),
            })?
        } else {
            value.to_string()
        };

        fs::write(&temp_path, body).map_err(|e| {
            StorageError::Write(format!(
                "Failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        fs::rename(&temp_path, &path).map_err(|e| {
            StorageError::Write(format!(
                "Failed to rename temp file to {}: {}",
                path.display(),
                e
            ))
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.record_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Write(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| {
            StorageError::Io(format!(
                "Failed to read directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut keys = Vec::new();
        for entry in read_dir {
            let path = entry.map_err(|e| StorageError::Io(e.to_string()))?.path();
            let key = if Self::is_digest_path(&path) {
                Self::read_digest_record(&path).map(|record| record.key)
            } else {
                Self::decode_file_name(&path)
            };
            match key {
                Some(key) => keys.push(key),
                None => debug!("Skipping foreign file {}", path.display()),
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path().join("store")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_set_get_remove() {
        let (store, _temp_dir) = setup();

        assert_eq!(store.get_item("app_x").unwrap(), None);

        store.set_item("app_x", "{\"a\":1}").unwrap();
        assert_eq!(store.get_item("app_x").unwrap().as_deref(), Some("{\"a\":1}"));

        store.set_item("app_x", "2").unwrap();
        assert_eq!(store.get_item("app_x").unwrap().as_deref(), Some("2"));

        store.remove_item("app_x").unwrap();
        assert_eq!(store.get_item("app_x").unwrap(), None);

        // Removing again is fine
        store.remove_item("app_x").unwrap();
    }

    #[test]
    fn test_keys_round_trip_through_file_names() {
        let (store, _temp_dir) = setup();
        store.set_item("app_mood/2024-01-01", "1").unwrap();
        store.set_item("über ключ", "2").unwrap();

        let mut keys = store.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["app_mood/2024-01-01", "über ключ"]);
    }

    #[test]
    fn test_foreign_files_ignored() {
        let (store, _temp_dir) = setup();
        store.set_item("app_x", "1").unwrap();
        fs::write(store.root().join("README.txt"), "hi").unwrap();
        fs::write(store.root().join("not-hex.json"), "{}").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["app_x"]);
    }

    #[test]
    fn test_long_keys_use_bounded_file_names() {
        let (store, _temp_dir) = setup();
        let long_key = format!("app_{}", "gratitude-entry-".repeat(16));
        let wide_key = "дневник".repeat(20);
        assert!(long_key.len() > 200);

        store.set_item(&long_key, "{\"text\":\"tea\"}").unwrap();
        store.set_item(&wide_key, "1").unwrap();

        assert_eq!(
            store.get_item(&long_key).unwrap().as_deref(),
            Some("{\"text\":\"tea\"}")
        );
        let mut keys = store.keys().unwrap();
        keys.sort();
        let mut expected = vec![long_key.clone(), wide_key.clone()];
        expected.sort();
        assert_eq!(keys, expected);

        for entry in fs::read_dir(store.root()).unwrap() {
            assert!(entry.unwrap().file_name().len() < 255);
        }

        store.remove_item(&long_key).unwrap();
        assert_eq!(store.get_item(&long_key).unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec![wide_key]);
    }

    #[test]
    fn test_survives_reopen() {
        let (store, _temp_dir) = setup();
        store.set_item("app_x", "\"kept\"").unwrap();

        let reopened = FileStore::open(store.root()).unwrap();
        assert_eq!(reopened.get_item("app_x").unwrap().as_deref(), Some("\"kept\""));
    }
}
