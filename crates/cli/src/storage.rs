//! File-backed cart storage.
//!
//! The file holds a JSON object of keys to string blobs, the same shape a
//! browser's local storage would have. Writes go to a sibling temp file that
//! is then renamed over the original.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cornershop_core::cart::{CartStorage, CartStorageError};

/// Key/value storage in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, CartStorageError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CartStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, CartStorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), CartStorageError> {
        // A corrupt file is replaced rather than blocking every later write.
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(CartStorageError::Serialization(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Replacing corrupt cart file");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };
        entries.insert(key.to_owned(), value);

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cornershop_core::ProductId;
    use cornershop_core::cart::{CART_STORAGE_KEY, CartStore, ProductSnapshot};
    use rust_decimal::Decimal;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "cornershop-cart-{}-{name}.json",
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let storage = FileStorage::new(temp_path("missing"));
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_set_keeps_other_keys() {
        let path = temp_path("keys");
        let mut storage = FileStorage::new(&path);

        storage.set("theme", "dark".to_string()).unwrap();
        storage.set(CART_STORAGE_KEY, "[]".to_string()).unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(reopened.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_cart_survives_reload() {
        let path = temp_path("reload");
        let mut store = CartStore::load(FileStorage::new(&path));
        store
            .add(
                ProductSnapshot {
                    id: ProductId::new(3),
                    name: "Classic Navy Hoodie".to_string(),
                    price: Decimal::new(4_999, 2),
                    image_url: None,
                },
                2,
            )
            .unwrap();

        let reloaded = CartStore::load(FileStorage::new(&path));
        assert_eq!(reloaded.cart().item_count(), 2);
        assert_eq!(reloaded.cart().total(), Decimal::new(9_998, 2));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_corrupt_file_loads_empty_cart_and_is_replaced() {
        let path = temp_path("corrupt");
        fs::write(&path, "{not json").unwrap();

        let mut store = CartStore::load(FileStorage::new(&path));
        assert!(store.cart().is_empty());

        store.clear().unwrap();
        let storage = FileStorage::new(&path);
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_unreadable_file_is_not_overwritten() {
        // A directory at the path reads as an I/O error, not corrupt JSON.
        let path = temp_path("unreadable");
        let _ = fs::remove_dir_all(&path);
        fs::create_dir(&path).unwrap();

        let mut storage = FileStorage::new(&path);
        let result = storage.set(CART_STORAGE_KEY, "[]".to_string());

        assert!(matches!(result, Err(CartStorageError::Io(_))));
        assert!(!path.with_extension("tmp").exists());
        assert!(path.is_dir());
        fs::remove_dir(path).unwrap();
    }
}
