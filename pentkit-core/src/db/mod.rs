//! Storage abstraction layer for the command catalog
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing the catalog to live in a YAML file or a SQLite database behind
//! one interface.

mod migration;
mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use migration::{
    copy_catalog, export_backend_to_json, export_to_json, import_from_json,
    import_json_to_backend, migrate_sqlite_to_yaml, migrate_yaml_to_sqlite,
};
pub use sqlite_backend::SqliteBackend;
pub use traits::{BackendType, CatalogBackend, CatalogStats, DatabaseConfig};
pub use yaml_backend::YamlBackend;

use anyhow::Result;
use std::path::Path;

/// Infers the backend type from a file extension (YAML when unknown)
pub fn infer_backend_type(path: &Path) -> BackendType {
    match path.extension().and_then(|e| e.to_str()) {
        Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
        _ => BackendType::Yaml,
    }
}

/// Creates a database backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn CatalogBackend>> {
    let bt = backend_type.unwrap_or_else(|| infer_backend_type(path));

    match bt {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
    }
}

/// Opens an existing database or creates a new, empty one
pub fn open_or_create(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn CatalogBackend>> {
    let backend = create_backend(path, backend_type)?;
    backend.create_if_not_exists()?;
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_infer_backend_type() {
        assert_eq!(infer_backend_type(Path::new("a.db")), BackendType::Sqlite);
        assert_eq!(infer_backend_type(Path::new("a.sqlite3")), BackendType::Sqlite);
        assert_eq!(infer_backend_type(Path::new("a.yaml")), BackendType::Yaml);
        assert_eq!(infer_backend_type(Path::new("catalog")), BackendType::Yaml);
    }

    #[test]
    fn test_open_or_create_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.yml");
        let backend = open_or_create(&path, None).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Yaml);
        assert!(path.exists());
    }

    #[test]
    fn test_explicit_type_overrides_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.yaml");
        let backend = create_backend(&path, Some(BackendType::Sqlite)).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Sqlite);
    }
}
