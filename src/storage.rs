//! Byte-level document storage keyed by `<storage_ref>/<file name>`.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document not found in storage: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

pub trait DocumentStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write bytes at `key`, replacing whatever was there.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Remove the object at `key`. Missing objects are not an error.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// File names directly under `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Join a storage reference and a file name into an object key.
pub fn object_key(storage_ref: &str, file_name: &str) -> String {
    format!("{}/{}", storage_ref.trim_end_matches('/'), file_name)
}

/// Reject keys that are empty, absolute, or climb out of the root.
fn check_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    let path = Path::new(key);
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Documents stored as plain files under a root directory.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

impl DocumentStorage for LocalFileStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        tracing::info!(key, size = bytes.len(), "Stored document");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(key, "Deleted document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(key, "Document not found for deletion");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.resolve(prefix)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-process storage for tests.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, key: &str, bytes: &[u8]) -> Self {
        if let Ok(mut objects) = self.objects.lock() {
            objects.insert(key.to_string(), bytes.to_vec());
        }
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().map(|o| o.contains_key(key)).unwrap_or(false)
    }
}

impl DocumentStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().map_err(|_| StorageError::LockPoisoned)?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        let mut objects = self.objects.lock().map_err(|_| StorageError::LockPoisoned)?;
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().map_err(|_| StorageError::LockPoisoned)?;
        objects.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.lock().map_err(|_| StorageError::LockPoisoned)?;
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        Ok(objects
            .keys()
            .filter_map(|k| k.strip_prefix(&dir))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_joins_without_double_slash() {
        assert_eq!(object_key("store/a/", "PAN_card.png"), "store/a/PAN_card.png");
        assert_eq!(object_key("store/a", "PAN_card.png"), "store/a/PAN_card.png");
    }

    #[test]
    fn traversal_keys_rejected() {
        assert!(check_key("../etc/passwd").is_err());
        assert!(check_key("/abs/path").is_err());
        assert!(check_key("   ").is_err());
        assert!(check_key("store/a/PAN_x.png").is_ok());
    }

    #[test]
    fn local_storage_put_get_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).unwrap();

        storage.put("app-1/AADHAAR_front.jpg", b"jpeg-bytes").unwrap();
        storage.put("app-1/PAN_card.png", b"png-bytes").unwrap();

        assert_eq!(storage.get("app-1/PAN_card.png").unwrap(), b"png-bytes");
        assert_eq!(
            storage.list("app-1").unwrap(),
            vec!["AADHAAR_front.jpg".to_string(), "PAN_card.png".to_string()]
        );

        storage.delete("app-1/PAN_card.png").unwrap();
        assert!(matches!(
            storage.get("app-1/PAN_card.png"),
            Err(StorageError::NotFound(_))
        ));
        // deleting twice is fine
        storage.delete("app-1/PAN_card.png").unwrap();
    }

    #[test]
    fn local_storage_lists_missing_prefix_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path()).unwrap();
        assert!(storage.list("nothing-here").unwrap().is_empty());
    }

    #[test]
    fn memory_storage_lists_direct_children_only() {
        let storage = MemoryStorage::new()
            .with_object("s/a.jpg", b"1")
            .with_object("s/nested/b.jpg", b"2")
            .with_object("other/c.jpg", b"3");
        assert_eq!(storage.list("s").unwrap(), vec!["a.jpg".to_string()]);
        assert!(storage.contains("other/c.jpg"));
    }
}
