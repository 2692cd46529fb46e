//! Durable key-value namespaces backing the persistent tier

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::AppError;

/// A flat string namespace that survives restarts.
///
/// Operations are synchronous: implementations are small local stores, and
/// cache reads must never wait on network I/O.
pub trait DurableStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Fails with [`AppError::StoreQuotaExceeded`] (or an I/O `StorageFull`)
    /// when the value does not fit.
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    fn remove(&self, key: &str) -> Result<(), AppError>;

    fn keys(&self) -> Result<Vec<String>, AppError>;

    /// Removes every key for which `keep` returns false
    fn retain(&self, keep: &dyn Fn(&str) -> bool) -> Result<usize, AppError> {
        let mut removed = 0;
        for key in self.keys()? {
            if !keep(&key) {
                self.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Bytes a key/value pair counts against a quota
fn pair_size(key: &str, value: &str) -> usize {
    key.len() + value.len()
}

fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| pair_size(k, v)).sum()
}

/// Checks that replacing `key` with `value` keeps the namespace within `quota`
fn check_quota(
    entries: &BTreeMap<String, String>,
    quota: Option<usize>,
    key: &str,
    value: &str,
) -> Result<(), AppError> {
    let Some(limit) = quota else {
        return Ok(());
    };
    let current = used_bytes(entries);
    let replaced = entries.get(key).map_or(0, |old| pair_size(key, old));
    let needed = current - replaced + pair_size(key, value);
    if needed > limit {
        return Err(AppError::store_quota_exceeded(key, needed, limit));
    }
    Ok(())
}

/// Parses the on-disk document. Empty content is an empty namespace.
fn parse_document(content: &str) -> Result<BTreeMap<String, String>, AppError> {
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(content).map_err(|e| AppError::store_corrupted(e.to_string()))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-process store, used for ephemeral runs and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store rejecting writes once keys and values exceed `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota: Some(quota),
        }
    }

    pub fn used_bytes(&self) -> usize {
        used_bytes(&lock(&self.entries))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = lock(&self.entries);
        check_quota(&entries, self.quota, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }
}

/// Store kept as a single JSON object on disk.
///
/// The whole document is rewritten on every change through a temporary file
/// and a rename, so a crash leaves either the old or the new document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// A corrupted document is logged and replaced by an empty namespace.
    pub fn open(path: impl AsRef<Path>, quota: Option<usize>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(content) => match parse_document(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("{} at {}, starting empty", e, path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened durable store at {} with {} keys",
            path.display(),
            entries.len()
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
        let content = serde_json::to_string(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!("Flushed {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = lock(&self.entries);
        check_quota(&entries, self.quota, key, value)?;

        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&entries) {
            // Keep memory consistent with what is on disk
            match previous {
                Some(previous) => entries.insert(key.to_string(), previous),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(lock(&self.entries).keys().cloned().collect())
    }

    fn retain(&self, keep: &dyn Fn(&str) -> bool) -> Result<usize, AppError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| keep(key));
        let removed = before - entries.len();
        if removed > 0 {
            self.flush(&entries)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_basic_operations() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_quota_counts_keys_and_values() {
        let store = MemoryStore::with_quota(10);
        store.set("abc", "1234").unwrap();
        assert_eq!(store.used_bytes(), 7);

        let err = store.set("de", "12").unwrap_err();
        assert!(err.is_quota_exceeded());

        // Replacing a key only counts the difference
        store.set("abc", "1234567").unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn test_retain_removes_rejected_keys() {
        let store = MemoryStore::new();
        for key in ["keep-1", "drop-1", "drop-2"] {
            store.set(key, "x").unwrap();
        }
        let removed = store.retain(&|key| key.starts_with("keep")).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.keys().unwrap(), vec!["keep-1".to_string()]);
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileStore::open(&path, None).unwrap();
            store.set("fixtures-persist:2025-03-05", "[]").unwrap();
            store.set("other", "value").unwrap();
            store.remove("other").unwrap();
        }

        let reopened = FileStore::open(&path, None).unwrap();
        assert_eq!(
            reopened.get("fixtures-persist:2025-03-05").unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(reopened.keys().unwrap().len(), 1);
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_parse_document_reports_corruption() {
        assert!(parse_document("  \n").unwrap().is_empty());
        assert_eq!(
            parse_document(r#"{"k":"v"}"#).unwrap().get("k").map(String::as_str),
            Some("v")
        );

        let err = parse_document("{ not json").unwrap_err();
        assert!(matches!(err, AppError::StoreCorrupted(_)));
        assert!(err.to_string().starts_with("Durable store is corrupted"));

        // Values must be strings
        assert!(matches!(
            parse_document(r#"{"k":1}"#),
            Err(AppError::StoreCorrupted(_))
        ));
    }

    #[test]
    fn test_file_store_corrupted_document_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path, None).unwrap();
        assert!(store.keys().unwrap().is_empty());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_store_quota_rejects_without_writing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path, Some(8)).unwrap();

        store.set("k", "1234").unwrap();
        assert!(store.set("big", "123456789").unwrap_err().is_quota_exceeded());

        let reopened = FileStore::open(&path, Some(8)).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["k".to_string()]);
    }
}
