use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::{infer_backend_type, BackendType, DatabaseConfig};
use crate::logging::LogFormat;

pub const DEFAULT_BIND: &str = "127.0.0.1:3001";

/// User configuration, stored as YAML in the home directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog file (YAML or SQLite)
    pub catalog_path: PathBuf,
    /// Inferred from the catalog file extension when not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendType>,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Config {
    /// Defaults rooted at `home`
    pub fn default_for_home(home: &Path) -> Self {
        Self {
            catalog_path: home.join(".pentkit").join("catalog.yaml"),
            backend: None,
            bind: default_bind(),
            log_format: LogFormat::default(),
        }
    }

    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Saves the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Loads the configuration, writing the defaults first if the file is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            let home = dirs::home_dir().context("Failed to determine home directory")?;
            Config::default_for_home(&home).save(&path)?;
            tracing::info!(path = ?path.as_ref(), "wrote default config");
        }
        Config::load(path)
    }

    /// Applies `PENTKIT_DB`, `PENTKIT_BIND` and `PORT` from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from a variable lookup
    ///
    /// `PORT` replaces only the port of `bind` and wins over `PENTKIT_BIND`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("PENTKIT_DB").filter(|v| !v.trim().is_empty()) {
            self.catalog_path = PathBuf::from(db);
        }
        if let Some(bind) = lookup("PENTKIT_BIND").filter(|v| !v.trim().is_empty()) {
            self.bind = bind;
        }
        if let Some(port) = lookup("PORT").filter(|v| !v.trim().is_empty()) {
            let host = self
                .bind
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| self.bind.clone());
            self.bind = format!("{}:{}", host, port.trim());
        }
    }

    /// Storage settings for opening the catalog
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            path: self.catalog_path.clone(),
            backend_type: self
                .backend
                .unwrap_or_else(|| infer_backend_type(&self.catalog_path)),
        }
    }
}

/// Gets the path to the config file
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("PENTKIT_CONFIG") {
        return Ok(PathBuf::from(path));
    }

    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".pentkit.yaml"))
}
