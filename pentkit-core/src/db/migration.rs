//! Migration utilities for converting between storage backends
//!
//! Copies a catalog between the YAML and SQLite backends, and exports or
//! imports JSON snapshots for backup and interoperability.

use anyhow::{Context, Result};
use std::path::Path;

use super::traits::{CatalogBackend, CatalogStats};
use super::{SqliteBackend, YamlBackend};
use crate::models::CatalogStore;

/// Copies everything from one backend into another, replacing its content
pub fn copy_catalog(from: &dyn CatalogBackend, to: &dyn CatalogBackend) -> Result<CatalogStats> {
    let store = from
        .load()
        .with_context(|| format!("Failed to load {} database", from.backend_type()))?;

    to.save(&store)
        .with_context(|| format!("Failed to save to {} database", to.backend_type()))?;

    tracing::info!(
        from = %from.path().display(),
        to = %to.path().display(),
        categories = store.categories.len(),
        commands = store.commands.len(),
        "catalog copied"
    );

    Ok(CatalogStats {
        category_count: store.categories.len(),
        command_count: store.commands.len(),
        backend_type: to.backend_type(),
    })
}

/// Migrates data from a YAML file to a SQLite database
pub fn migrate_yaml_to_sqlite<P1: AsRef<Path>, P2: AsRef<Path>>(
    yaml_path: P1,
    sqlite_path: P2,
) -> Result<CatalogStats> {
    let yaml_backend = YamlBackend::new(yaml_path);
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    copy_catalog(&yaml_backend, &sqlite_backend)
}

/// Migrates data from a SQLite database to a YAML file
pub fn migrate_sqlite_to_yaml<P1: AsRef<Path>, P2: AsRef<Path>>(
    sqlite_path: P1,
    yaml_path: P2,
) -> Result<CatalogStats> {
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    let yaml_backend = YamlBackend::new(yaml_path);
    copy_catalog(&sqlite_backend, &yaml_backend)
}

/// Exports a catalog to a JSON file
pub fn export_to_json<P: AsRef<Path>>(store: &CatalogStore, json_path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("Failed to serialize to JSON")?;

    std::fs::write(json_path, json).context("Failed to write JSON file")?;

    Ok(())
}

/// Imports a catalog from a JSON file
pub fn import_from_json<P: AsRef<Path>>(json_path: P) -> Result<CatalogStore> {
    let json = std::fs::read_to_string(json_path).context("Failed to read JSON file")?;

    let store: CatalogStore = serde_json::from_str(&json).context("Failed to parse JSON")?;
    store.validate_unique_names()?;

    Ok(store)
}

/// Exports data from any backend to a JSON file
pub fn export_backend_to_json<P: AsRef<Path>>(
    backend: &dyn CatalogBackend,
    json_path: P,
) -> Result<CatalogStats> {
    let store = backend.load()?;
    export_to_json(&store, json_path)?;
    Ok(CatalogStats {
        category_count: store.categories.len(),
        command_count: store.commands.len(),
        backend_type: backend.backend_type(),
    })
}

/// Replaces the content of any backend with a JSON snapshot
pub fn import_json_to_backend<P: AsRef<Path>>(
    backend: &dyn CatalogBackend,
    json_path: P,
) -> Result<CatalogStats> {
    let store = import_from_json(json_path)?;
    backend.save(&store)?;
    Ok(CatalogStats {
        category_count: store.categories.len(),
        command_count: store.commands.len(),
        backend_type: backend.backend_type(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Command, Phase};
    use tempfile::TempDir;

    fn sample_store() -> CatalogStore {
        let parent = Category::new_default("General Penetration Testing", "General", "", 0);
        let mut child = Category::new("Cloud".to_string(), "General".to_string());
        child.order = 100;
        child.parent_category = Some(parent.id);
        let mut command = Command::new(
            "Basic Nmap Scan".to_string(),
            "nmap -sC -sV {domain}".to_string(),
            parent.id,
            Phase::Reconnaissance,
        );
        command.tags = vec!["nmap".to_string()];
        CatalogStore {
            categories: vec![parent, child],
            commands: vec![command],
        }
    }

    #[test]
    fn test_yaml_to_sqlite_and_back() {
        let dir = TempDir::new().unwrap();
        let yaml_path = dir.path().join("catalog.yaml");
        let sqlite_path = dir.path().join("catalog.db");
        let round_trip_path = dir.path().join("round-trip.yaml");

        let original = sample_store();
        YamlBackend::new(&yaml_path).save(&original).unwrap();

        let stats = migrate_yaml_to_sqlite(&yaml_path, &sqlite_path).unwrap();
        assert_eq!(stats.category_count, 2);
        assert_eq!(stats.command_count, 1);

        migrate_sqlite_to_yaml(&sqlite_path, &round_trip_path).unwrap();
        let restored = YamlBackend::new(&round_trip_path).load().unwrap();

        for category in &original.categories {
            let copy = restored.get_category(&category.id).unwrap();
            assert_eq!(copy.name, category.name);
            assert_eq!(copy.parent_category, category.parent_category);
            assert_eq!(copy.is_default, category.is_default);
        }
        let command = &original.commands[0];
        assert_eq!(restored.get_command(&command.id).unwrap().tags, command.tags);
    }

    #[test]
    fn test_json_export_import() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("backup.json");
        let backend = SqliteBackend::in_memory().unwrap();
        backend.save(&sample_store()).unwrap();

        export_backend_to_json(&backend, &json_path).unwrap();

        let target = SqliteBackend::in_memory().unwrap();
        let stats = import_json_to_backend(&target, &json_path).unwrap();
        assert_eq!(stats.category_count, 2);
        assert_eq!(target.stats().unwrap().command_count, 1);
    }
}
