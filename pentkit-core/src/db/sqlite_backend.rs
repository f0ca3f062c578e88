//! SQLite database storage backend
//!
//! Stores categories and commands in two tables, with per-record queries
//! instead of whole-catalog rewrites.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::traits::{BackendType, CatalogBackend, CatalogStats};
use crate::models::{CatalogStore, Category, Command, Phase};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const CATEGORY_COLUMNS: &str = "id, name, category_type, description, sort_order, is_default,
     parent_category, created_at, updated_at";

const COMMAND_COLUMNS: &str = "id, name, command, description, category, phase, tags,
     sort_order, created_at, updated_at";

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

/// Raw category row, converted outside of the rusqlite row closure
struct CategoryRow {
    id: String,
    name: String,
    category_type: String,
    description: String,
    order: i64,
    is_default: bool,
    parent_category: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CategoryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category_type: row.get(2)?,
            description: row.get(3)?,
            order: row.get(4)?,
            is_default: row.get(5)?,
            parent_category: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_category(self) -> Result<Category> {
        let parent_category = match self.parent_category {
            Some(p) => Some(parse_id(&p)?),
            None => None,
        };
        Ok(Category {
            id: parse_id(&self.id)?,
            name: self.name,
            category_type: self.category_type,
            description: self.description,
            order: self.order,
            is_default: self.is_default,
            parent_category,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

/// Raw command row
struct CommandRow {
    id: String,
    name: String,
    command: String,
    description: String,
    category: String,
    phase: String,
    tags: String,
    order: i64,
    created_at: String,
    updated_at: String,
}

impl CommandRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            command: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            phase: row.get(5)?,
            tags: row.get(6)?,
            order: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_command(self) -> Result<Command> {
        let phase: Phase = self.phase.parse().map_err(anyhow::Error::msg)?;
        let tags: Vec<String> =
            serde_json::from_str(&self.tags).context("Failed to deserialize tags")?;
        Ok(Command {
            id: parse_id(&self.id)?,
            name: self.name,
            command: self.command,
            description: self.description,
            category: parse_id(&self.category)?,
            phase,
            tags,
            order: self.order,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn parse_id(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("Invalid id in database: {}", s))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl SqliteBackend {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database {:?}", path))?;
        Self::with_connection(path, conn)
    }

    /// Creates a backend on a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(PathBuf::from(":memory:"), conn)
    }

    fn with_connection(path: PathBuf, conn: Connection) -> Result<Self> {
        // WAL for concurrent readers; foreign keys back the delete invariants
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("SQLite connection mutex poisoned"))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    fn query_categories(
        conn: &Connection,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Category>> {
        let sql = format!("SELECT {} FROM categories {}", CATEGORY_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(args, CategoryRow::from_row)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?.into_category()?);
        }
        Ok(categories)
    }

    fn query_commands(
        conn: &Connection,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<Command>> {
        let sql = format!("SELECT {} FROM commands {}", COMMAND_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(args, CommandRow::from_row)?;

        let mut commands = Vec::new();
        for row in rows {
            commands.push(row?.into_command()?);
        }
        Ok(commands)
    }

    fn insert_category(conn: &Connection, category: &Category) -> Result<()> {
        conn.execute(
            "INSERT INTO categories
             (id, name, category_type, description, sort_order, is_default, parent_category,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                category.id.to_string(),
                category.name,
                category.category_type,
                category.description,
                category.order,
                category.is_default,
                category.parent_category.map(|p| p.to_string()),
                category.created_at.to_rfc3339(),
                category.updated_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to insert category '{}'", category.name))?;
        Ok(())
    }

    fn insert_command(conn: &Connection, command: &Command) -> Result<()> {
        conn.execute(
            "INSERT INTO commands
             (id, name, command, description, category, phase, tags, sort_order,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                command.id.to_string(),
                command.name,
                command.command,
                command.description,
                command.category.to_string(),
                command.phase.as_str(),
                serde_json::to_string(&command.tags)?,
                command.order,
                command.created_at.to_rfc3339(),
                command.updated_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to insert command '{}'", command.name))?;
        Ok(())
    }
}

impl CatalogBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CatalogStore> {
        let conn = self.conn()?;
        Ok(CatalogStore {
            categories: Self::query_categories(&conn, "ORDER BY created_at", &[])?,
            commands: Self::query_commands(&conn, "ORDER BY created_at", &[])?,
        })
    }

    fn save(&self, store: &CatalogStore) -> Result<()> {
        let mut conn = self.conn()?;

        // Rolled back on drop if any statement fails
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM commands", [])?;
        tx.execute("DELETE FROM categories", [])?;

        for category in &store.categories {
            Self::insert_category(&tx, category)?;
        }
        for command in &store.commands {
            Self::insert_command(&tx, command)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn update_atomically<F>(&self, update_fn: F) -> Result<CatalogStore>
    where
        F: FnOnce(&mut CatalogStore),
    {
        let mut store = self.load()?;
        update_fn(&mut store);
        self.save(&store)?;
        Ok(store)
    }

    fn get_category(&self, id: &Uuid) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let id = id.to_string();
        Ok(Self::query_categories(&conn, "WHERE id = ?1", &[&id])?
            .into_iter()
            .next())
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        Ok(Self::query_categories(&conn, "WHERE name = ?1", &[&name])?
            .into_iter()
            .next())
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        Self::query_categories(&conn, "ORDER BY created_at", &[])
    }

    fn add_category(&self, category: &Category) -> Result<()> {
        let conn = self.conn()?;
        Self::insert_category(&conn, category)
    }

    fn update_category(&self, category: &Category) -> Result<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE categories
             SET name = ?2, category_type = ?3, description = ?4, sort_order = ?5,
                 is_default = ?6, parent_category = ?7, updated_at = ?8
             WHERE id = ?1",
            params![
                category.id.to_string(),
                category.name,
                category.category_type,
                category.description,
                category.order,
                category.is_default,
                category.parent_category.map(|p| p.to_string()),
                category.updated_at.to_rfc3339(),
            ],
        )?;
        if rows_affected == 0 {
            anyhow::bail!("Category not found: {}", category.id)
        }
        Ok(())
    }

    fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected =
            conn.execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])?;
        Ok(rows_affected > 0)
    }

    fn count_subcategories(&self, id: &Uuid) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE parent_category = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn max_custom_category_order(&self) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sort_order) FROM categories WHERE is_default = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn set_category_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE categories SET sort_order = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), order, Utc::now().to_rfc3339()],
        )?;
        Ok(rows_affected > 0)
    }

    fn get_command(&self, id: &Uuid) -> Result<Option<Command>> {
        let conn = self.conn()?;
        let id = id.to_string();
        Ok(Self::query_commands(&conn, "WHERE id = ?1", &[&id])?
            .into_iter()
            .next())
    }

    fn list_commands(&self) -> Result<Vec<Command>> {
        let conn = self.conn()?;
        Self::query_commands(&conn, "ORDER BY created_at", &[])
    }

    fn add_command(&self, command: &Command) -> Result<()> {
        let conn = self.conn()?;
        Self::insert_command(&conn, command)
    }

    fn update_command(&self, command: &Command) -> Result<()> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE commands
             SET name = ?2, command = ?3, description = ?4, category = ?5, phase = ?6,
                 tags = ?7, sort_order = ?8, updated_at = ?9
             WHERE id = ?1",
            params![
                command.id.to_string(),
                command.name,
                command.command,
                command.description,
                command.category.to_string(),
                command.phase.as_str(),
                serde_json::to_string(&command.tags)?,
                command.order,
                command.updated_at.to_rfc3339(),
            ],
        )?;
        if rows_affected == 0 {
            anyhow::bail!("Command not found: {}", command.id)
        }
        Ok(())
    }

    fn delete_command(&self, id: &Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute("DELETE FROM commands WHERE id = ?1", [id.to_string()])?;
        Ok(rows_affected > 0)
    }

    fn count_commands_in_category(&self, category: &Uuid) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM commands WHERE category = ?1",
            [category.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn max_command_order(&self, category: &Uuid, phase: Phase) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let max: Option<i64> = conn
            .query_row(
                "SELECT MAX(sort_order) FROM commands WHERE category = ?1 AND phase = ?2",
                params![category.to_string(), phase.as_str()],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        Ok(max)
    }

    fn set_command_order(&self, id: &Uuid, order: i64) -> Result<bool> {
        let conn = self.conn()?;
        let rows_affected = conn.execute(
            "UPDATE commands SET sort_order = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.to_string(), order, Utc::now().to_rfc3339()],
        )?;
        Ok(rows_affected > 0)
    }

    /// The database is created when the connection opens
    fn exists(&self) -> bool {
        true
    }

    fn stats(&self) -> Result<CatalogStats> {
        let conn = self.conn()?;
        let category_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        let command_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM commands", [], |row| row.get(0))?;
        Ok(CatalogStats {
            category_count: category_count as usize,
            command_count: command_count as usize,
            backend_type: BackendType::Sqlite,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_category(name: &str) -> Category {
        Category::new(name.to_string(), "General".to_string())
    }

    #[test]
    fn test_sqlite_backend_create_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        backend.create_if_not_exists().unwrap();

        let store = backend.load().unwrap();
        assert!(store.categories.is_empty());
        assert!(store.commands.is_empty());
    }

    #[test]
    fn test_sqlite_backend_save_and_load() {
        let temp_file = NamedTempFile::with_suffix(".db").unwrap();
        let backend = SqliteBackend::new(temp_file.path()).unwrap();

        let parent = sample_category("Parent");
        let mut child = sample_category("Child");
        child.parent_category = Some(parent.id);
        let mut command = Command::new(
            "Whois".to_string(),
            "whois {domain}".to_string(),
            child.id,
            Phase::PostExploitation,
        );
        command.tags = vec!["whois".to_string(), "osint".to_string()];

        // Child listed before its parent; foreign keys are checked at commit
        let store = CatalogStore {
            categories: vec![child.clone(), parent.clone()],
            commands: vec![command.clone()],
        };
        backend.save(&store).unwrap();

        let loaded = backend.load().unwrap();
        assert_eq!(loaded.categories.len(), 2);
        let loaded_command = loaded.get_command(&command.id).unwrap();
        assert_eq!(loaded_command.phase, Phase::PostExploitation);
        assert_eq!(loaded_command.tags, command.tags);
        assert_eq!(
            loaded.get_category(&child.id).unwrap().parent_category,
            Some(parent.id)
        );
    }

    #[test]
    fn test_sqlite_backend_point_operations() {
        let backend = SqliteBackend::in_memory().unwrap();
        let category = sample_category("Recon");
        backend.add_category(&category).unwrap();

        let mut first = Command::new("a".into(), "a".into(), category.id, Phase::Scanning);
        first.order = 3;
        let second = Command::new("b".into(), "b".into(), category.id, Phase::Scanning);
        backend.add_command(&first).unwrap();
        backend.add_command(&second).unwrap();

        assert_eq!(backend.count_commands_in_category(&category.id).unwrap(), 2);
        assert_eq!(
            backend.max_command_order(&category.id, Phase::Scanning).unwrap(),
            Some(3)
        );
        assert_eq!(
            backend.max_command_order(&category.id, Phase::Reporting).unwrap(),
            None
        );

        assert!(backend.set_command_order(&second.id, 0).unwrap());
        assert_eq!(backend.get_command(&second.id).unwrap().unwrap().order, 0);
        assert!(!backend.set_command_order(&Uuid::new_v4(), 1).unwrap());

        assert!(backend.delete_command(&first.id).unwrap());
        assert!(backend.get_command(&first.id).unwrap().is_none());
    }

    #[test]
    fn test_sqlite_backend_foreign_key_blocks_referenced_delete() {
        let backend = SqliteBackend::in_memory().unwrap();
        let category = sample_category("Web");
        backend.add_category(&category).unwrap();
        let command = Command::new("x".into(), "x".into(), category.id, Phase::Reporting);
        backend.add_command(&command).unwrap();

        assert!(backend.delete_category(&category.id).is_err());
        assert!(backend.get_category(&category.id).unwrap().is_some());
    }

    #[test]
    fn test_sqlite_backend_unique_names() {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.add_category(&sample_category("Same")).unwrap();
        assert!(backend.add_category(&sample_category("Same")).is_err());
    }

    #[test]
    fn test_sqlite_backend_max_custom_order_ignores_defaults() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert_eq!(backend.max_custom_category_order().unwrap(), None);

        backend
            .add_category(&Category::new_default("General", "General", "", 500))
            .unwrap();
        assert_eq!(backend.max_custom_category_order().unwrap(), None);

        let mut custom = sample_category("Custom");
        custom.order = 104;
        backend.add_category(&custom).unwrap();
        assert_eq!(backend.max_custom_category_order().unwrap(), Some(104));
        assert_eq!(backend.get_category_by_name("Custom").unwrap().unwrap().id, custom.id);
    }
}
