//! YAML file storage backend
//!
//! Stores the whole catalog in a single YAML file through `Storage`, which
//! provides the file locking. Every per-record write re-reads the file and
//! saves it under one exclusive lock, so concurrent writers never overwrite
//! each other's changes.

use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::traits::{BackendType, CatalogBackend};
use crate::models::{CatalogStore, Category, Command};
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlBackend {
    storage: Storage,
    path: PathBuf,
}

impl YamlBackend {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Gets a reference to the underlying Storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl CatalogBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CatalogStore> {
        self.storage.load()
    }

    fn save(&self, store: &CatalogStore) -> Result<()> {
        self.storage.save(store)
    }

    fn update_atomically<F>(&self, update_fn: F) -> Result<CatalogStore>
    where
        F: FnOnce(&mut CatalogStore),
    {
        self.storage.update_atomically(update_fn)
    }

    fn add_category(&self, category: &Category) -> Result<()> {
        let mut exists = false;
        let mut name_taken = false;
        self.storage.update_atomically(|store| {
            exists = store.get_category(&category.id).is_some();
            name_taken = name_in_use(store, category);
            if !exists && !name_taken {
                store.categories.push(category.clone());
            }
        })?;
        if exists {
            anyhow::bail!("Category already exists: {}", category.id)
        }
        if name_taken {
            anyhow::bail!("Category name already in use: {}", category.name)
        }
        Ok(())
    }

    fn update_category(&self, category: &Category) -> Result<()> {
        let mut found = false;
        let mut name_taken = false;
        self.storage.update_atomically(|store| {
            name_taken = name_in_use(store, category);
            if name_taken {
                return;
            }
            if let Some(existing) = store.get_category_mut(&category.id) {
                *existing = category.clone();
                found = true;
            }
        })?;
        if name_taken {
            anyhow::bail!("Category name already in use: {}", category.name)
        }
        if !found {
            anyhow::bail!("Category not found: {}", category.id)
        }
        Ok(())
    }

    fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let mut removed = false;
        self.storage.update_atomically(|store| {
            let before = store.categories.len();
            store.categories.retain(|c| &c.id != id);
            removed = store.categories.len() != before;
        })?;
        Ok(removed)
    }

    fn set_category_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let mut found = false;
        self.storage.update_atomically(|store| {
            if let Some(category) = store.get_category_mut(id) {
                category.order = order;
                category.updated_at = Utc::now();
                found = true;
            }
        })?;
        Ok(found)
    }

    fn add_command(&self, command: &Command) -> Result<()> {
        let mut exists = false;
        self.storage.update_atomically(|store| {
            exists = store.get_command(&command.id).is_some();
            if !exists {
                store.commands.push(command.clone());
            }
        })?;
        if exists {
            anyhow::bail!("Command already exists: {}", command.id)
        }
        Ok(())
    }

    fn update_command(&self, command: &Command) -> Result<()> {
        let mut found = false;
        self.storage.update_atomically(|store| {
            if let Some(existing) = store.get_command_mut(&command.id) {
                *existing = command.clone();
                found = true;
            }
        })?;
        if !found {
            anyhow::bail!("Command not found: {}", command.id)
        }
        Ok(())
    }

    fn delete_command(&self, id: &Uuid) -> Result<bool> {
        let mut removed = false;
        self.storage.update_atomically(|store| {
            let before = store.commands.len();
            store.commands.retain(|c| &c.id != id);
            removed = store.commands.len() != before;
        })?;
        Ok(removed)
    }

    fn set_command_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let mut found = false;
        self.storage.update_atomically(|store| {
            if let Some(command) = store.get_command_mut(id) {
                command.order = order;
                command.updated_at = Utc::now();
                found = true;
            }
        })?;
        Ok(found)
    }
}

/// Category names are unique, as enforced by the SQLite schema
fn name_in_use(store: &CatalogStore, category: &Category) -> bool {
    store
        .categories
        .iter()
        .any(|c| c.name == category.name && c.id != category.id)
}
