use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::models::CatalogStore;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_RETRY: Duration = Duration::from_millis(100);

/// Saves and loads the catalog as a single YAML file, with an advisory
/// lock file so that several processes can share it
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let mut lock_name = file_path.as_os_str().to_os_string();
        lock_name.push(".lock");
        Self {
            file_path,
            lock_file_path: PathBuf::from(lock_name),
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(|| FileExt::try_lock_exclusive(&lock_file))?;
        Ok(lock_file)
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        self.wait_for_lock(|| FileExt::try_lock_shared(&lock_file))?;
        Ok(Some(lock_file))
    }

    fn wait_for_lock<F>(&self, mut try_lock: F) -> Result<()>
    where
        F: FnMut() -> std::io::Result<()>,
    {
        let start = Instant::now();
        loop {
            match try_lock() {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process is writing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(LOCK_RETRY);
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    fn read_store(&self) -> Result<CatalogStore> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let mut content = String::new();
        BufReader::new(file)
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to read {:?}", self.file_path))?;

        if content.trim().is_empty() {
            return Ok(CatalogStore::new());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))
    }

    fn write_store(&self, lock_file: &mut File, store: &CatalogStore) -> Result<()> {
        // Lock holder info, for debugging only
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let yaml = serde_yaml::to_string(store)?;
        fs::write(&self.file_path, yaml)
            .with_context(|| format!("Failed to write {:?}", self.file_path))?;
        Ok(())
    }

    /// Loads the catalog from the YAML file, creating an empty one if missing
    pub fn load(&self) -> Result<CatalogStore> {
        if !self.file_path.exists() {
            let default_store = CatalogStore::new();
            self.save(&default_store)?;
            return Ok(default_store);
        }

        let _lock = self.acquire_read_lock()?;
        let store = self.read_store()?;
        store.validate_unique_names()?;
        Ok(store)
    }

    /// Saves the catalog to the YAML file with file locking
    pub fn save(&self, store: &CatalogStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Lock is released when lock_file is dropped
        let mut lock_file = self.acquire_write_lock()?;
        self.write_store(&mut lock_file, store)
    }

    /// Reloads the file, applies changes, and saves while holding the write lock
    pub fn update_atomically<F>(&self, update_fn: F) -> Result<CatalogStore>
    where
        F: FnOnce(&mut CatalogStore),
    {
        let mut lock_file = self.acquire_write_lock()?;

        let mut store = if self.file_path.exists() {
            self.read_store()?
        } else {
            CatalogStore::new()
        };

        update_fn(&mut store);

        self.write_store(&mut lock_file, &store)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("catalog.yaml");
        let storage = Storage::new(&path);

        let store = storage.load().unwrap();

        assert!(store.categories.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_update_atomically_persists() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("catalog.yaml"));

        storage
            .update_atomically(|store| {
                store
                    .categories
                    .push(Category::new("Recon".to_string(), "General".to_string()));
            })
            .unwrap();

        let store = storage.load().unwrap();
        assert_eq!(store.categories.len(), 1);
        assert_eq!(store.categories[0].name, "Recon");
        assert!(dir.path().join("catalog.yaml.lock").exists());
    }

    #[test]
    fn test_load_rejects_duplicate_names() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("catalog.yaml"));
        let mut store = CatalogStore::new();
        store
            .categories
            .push(Category::new("Same".to_string(), "A".to_string()));
        store
            .categories
            .push(Category::new("Same".to_string(), "B".to_string()));
        storage.save(&store).unwrap();

        assert!(storage.load().is_err());
    }

    #[test]
    fn test_update_atomically_serialises_writers() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("catalog.yaml"));
        storage.save(&CatalogStore::new()).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let storage = &storage;
                scope.spawn(move || {
                    storage
                        .update_atomically(|store| {
                            store
                                .categories
                                .push(Category::new(format!("Cat {}", i), "General".to_string()));
                        })
                        .unwrap();
                    storage.load().unwrap();
                });
            }
        });

        assert_eq!(storage.load().unwrap().categories.len(), 8);
    }
}
