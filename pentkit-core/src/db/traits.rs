//! Database abstraction traits
//!
//! This module defines the core trait that all storage backends must implement.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::models::{CatalogStore, Category, Command, Phase};

/// Types of database backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// YAML file storage (single file)
    Yaml,
    /// SQLite database storage
    Sqlite,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(BackendType::Yaml),
            "sqlite" | "db" => Ok(BackendType::Sqlite),
            _ => anyhow::bail!("Unknown backend type '{}'. Use yaml or sqlite", s),
        }
    }
}

/// Configuration for database backends
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub path: PathBuf,
    /// Backend type
    pub backend_type: BackendType,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("catalog.yaml"),
            backend_type: BackendType::Yaml,
        }
    }
}

/// Core trait for catalog storage backends
///
/// `load()` and `save()` work with the full `CatalogStore`; the per-record
/// operations default to load/modify/save. Backends shared between
/// concurrent writers must override the writes so the read and the save
/// happen under one lock or transaction. Every per-record write is an
/// independent point update: nothing here spans more than one record
/// atomically.
pub trait CatalogBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the database file
    fn path(&self) -> &std::path::Path;

    // =========================================================================
    // Full Store Operations
    // =========================================================================

    /// Loads the entire catalog
    fn load(&self) -> Result<CatalogStore>;

    /// Replaces the entire catalog
    fn save(&self, store: &CatalogStore) -> Result<()>;

    /// Performs an atomic update operation
    /// Default implementation loads, applies changes, and saves
    fn update_atomically<F>(&self, update_fn: F) -> Result<CatalogStore>
    where
        F: FnOnce(&mut CatalogStore),
        Self: Sized,
    {
        let mut store = self.load()?;
        update_fn(&mut store);
        self.save(&store)?;
        Ok(store)
    }

    // =========================================================================
    // Category Operations
    // =========================================================================

    fn get_category(&self, id: &Uuid) -> Result<Option<Category>> {
        Ok(self.load()?.get_category(id).cloned())
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let store = self.load()?;
        Ok(store.categories.into_iter().find(|c| c.name == name))
    }

    /// Lists all categories in storage order
    fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.load()?.categories)
    }

    fn add_category(&self, category: &Category) -> Result<()> {
        let mut store = self.load()?;
        if store.get_category(&category.id).is_some() {
            anyhow::bail!("Category already exists: {}", category.id)
        }
        store.categories.push(category.clone());
        self.save(&store)
    }

    /// Replaces a stored category
    fn update_category(&self, category: &Category) -> Result<()> {
        let mut store = self.load()?;
        match store.get_category_mut(&category.id) {
            Some(existing) => {
                *existing = category.clone();
                self.save(&store)
            }
            None => anyhow::bail!("Category not found: {}", category.id),
        }
    }

    /// Deletes a category; returns false when it did not exist
    fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let mut store = self.load()?;
        let original_len = store.categories.len();
        store.categories.retain(|c| &c.id != id);
        if store.categories.len() == original_len {
            return Ok(false);
        }
        self.save(&store)?;
        Ok(true)
    }

    fn count_subcategories(&self, id: &Uuid) -> Result<usize> {
        Ok(self.load()?.subcategories(id).len())
    }

    fn max_custom_category_order(&self) -> Result<Option<i64>> {
        Ok(self.load()?.max_custom_category_order())
    }

    /// Sets a single category's order; returns false when it did not exist
    fn set_category_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let mut store = self.load()?;
        match store.get_category_mut(id) {
            Some(category) => {
                category.order = order;
                category.updated_at = Utc::now();
                self.save(&store)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Command Operations
    // =========================================================================

    fn get_command(&self, id: &Uuid) -> Result<Option<Command>> {
        Ok(self.load()?.get_command(id).cloned())
    }

    /// Lists all commands in storage order
    fn list_commands(&self) -> Result<Vec<Command>> {
        Ok(self.load()?.commands)
    }

    fn add_command(&self, command: &Command) -> Result<()> {
        let mut store = self.load()?;
        if store.get_command(&command.id).is_some() {
            anyhow::bail!("Command already exists: {}", command.id)
        }
        store.commands.push(command.clone());
        self.save(&store)
    }

    fn update_command(&self, command: &Command) -> Result<()> {
        let mut store = self.load()?;
        match store.get_command_mut(&command.id) {
            Some(existing) => {
                *existing = command.clone();
                self.save(&store)
            }
            None => anyhow::bail!("Command not found: {}", command.id),
        }
    }

    /// Deletes a command; returns false when it did not exist
    fn delete_command(&self, id: &Uuid) -> Result<bool> {
        let mut store = self.load()?;
        let original_len = store.commands.len();
        store.commands.retain(|c| &c.id != id);
        if store.commands.len() == original_len {
            return Ok(false);
        }
        self.save(&store)?;
        Ok(true)
    }

    fn count_commands_in_category(&self, category: &Uuid) -> Result<usize> {
        Ok(self.load()?.count_commands_in_category(category))
    }

    fn max_command_order(&self, category: &Uuid, phase: Phase) -> Result<Option<i64>> {
        Ok(self.load()?.max_command_order(category, phase))
    }

    /// Sets a single command's order; returns false when it did not exist
    fn set_command_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let mut store = self.load()?;
        match store.get_command_mut(id) {
            Some(command) => {
                command.order = order;
                command.updated_at = Utc::now();
                self.save(&store)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Returns true if the database file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates the database with an empty catalog if it doesn't exist
    fn create_if_not_exists(&self) -> Result<()> {
        if !self.exists() {
            self.save(&CatalogStore::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the database
    fn stats(&self) -> Result<CatalogStats> {
        let store = self.load()?;
        Ok(CatalogStats {
            category_count: store.categories.len(),
            command_count: store.commands.len(),
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a catalog database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogStats {
    pub category_count: usize,
    pub command_count: usize,
    pub backend_type: BackendType,
}
