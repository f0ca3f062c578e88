pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod logging;
pub mod models;
pub mod reorder;
pub mod search;
pub mod storage;
pub mod view;

// Re-export commonly used types
pub use catalog::Catalog;
pub use config::{config_path, Config};
pub use db::{BackendType, CatalogBackend, CatalogStats, SqliteBackend, YamlBackend};
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use generator::{GenerateRequest, GeneratedCommand, GeneratorInputs, Placeholder};
pub use logging::LogFormat;
pub use models::{
    CatalogStore, Category, CategoryUpdate, Command, CommandUpdate, NewCategory, NewCommand,
    OrderUpdate, Phase, ResolvedCategory, ResolvedCommand,
};
pub use reorder::{contiguous_orders, move_item};
pub use search::SearchHit;
pub use storage::Storage;
pub use view::{Dialog, NoticeLevel, ViewState};
