//! Catalog service: validated CRUD over a storage backend
//!
//! Referential integrity between categories and commands is enforced here
//! with explicit count checks before deletes. The checks and the delete are
//! separate backend calls, so a concurrent insert between them can slip
//! through.

use chrono::Utc;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{self, BackendType, CatalogBackend, DatabaseConfig};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    category_lookup, clean_tags, sort_categories, sort_commands, Category, CategoryUpdate,
    Command, CommandUpdate, NewCategory, NewCommand, Phase, ResolvedCategory, ResolvedCommand,
    FIRST_CUSTOM_CATEGORY_ORDER,
};

/// The command catalog
pub struct Catalog {
    backend: Box<dyn CatalogBackend>,
}

impl Catalog {
    pub fn new(backend: Box<dyn CatalogBackend>) -> Self {
        Self { backend }
    }

    /// Opens (or creates) the catalog stored at `path`
    pub fn open(path: &Path, backend_type: Option<BackendType>) -> CatalogResult<Self> {
        let backend = db::open_or_create(path, backend_type)?;
        info!(
            path = %path.display(),
            backend = %backend.backend_type(),
            "catalog opened"
        );
        Ok(Self::new(backend))
    }

    pub fn from_config(config: &DatabaseConfig) -> CatalogResult<Self> {
        Self::open(&config.path, Some(config.backend_type))
    }

    pub fn backend(&self) -> &dyn CatalogBackend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Category reads
    // =========================================================================

    /// All categories, default first, then by order and name, parents resolved
    pub fn categories(&self) -> CatalogResult<Vec<ResolvedCategory>> {
        let all = self.backend.list_categories()?;
        let lookup = category_lookup(&all);
        let mut sorted = all;
        sort_categories(&mut sorted);
        debug!(count = sorted.len(), "listed categories");
        Ok(sorted
            .into_iter()
            .map(|c| ResolvedCategory::resolve(c, &lookup))
            .collect())
    }

    pub fn category(&self, id: &Uuid) -> CatalogResult<ResolvedCategory> {
        let category = self.require_category(id)?;
        let parent = match category.parent_category {
            Some(parent_id) => self.backend.get_category(&parent_id)?,
            None => None,
        };
        let lookup = category_lookup(parent.as_slice());
        Ok(ResolvedCategory::resolve(category, &lookup))
    }

    pub fn categories_by_type(&self, category_type: &str) -> CatalogResult<Vec<ResolvedCategory>> {
        Ok(self
            .categories()?
            .into_iter()
            .filter(|c| c.category_type == category_type)
            .collect())
    }

    /// Top-level categories, in display order
    pub fn main_categories(&self) -> CatalogResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .backend
            .list_categories()?
            .into_iter()
            .filter(|c| c.parent_category.is_none())
            .collect();
        sort_categories(&mut categories);
        Ok(categories)
    }

    /// Direct children of `parent`, in display order
    pub fn subcategories(&self, parent: &Uuid) -> CatalogResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .backend
            .list_categories()?
            .into_iter()
            .filter(|c| c.parent_category.as_ref() == Some(parent))
            .collect();
        sort_categories(&mut categories);
        Ok(categories)
    }

    // =========================================================================
    // Category writes
    // =========================================================================

    /// Creates a user category placed after every existing user category
    pub fn create_category(&self, request: NewCategory) -> CatalogResult<ResolvedCategory> {
        let name = required("Category name", &request.name)?;
        let category_type = required("Category type", &request.category_type)?;
        self.ensure_name_available(&name, None)?;

        if let Some(parent_id) = &request.parent_category {
            self.require_parent(parent_id)?;
        }

        let order = match self.backend.max_custom_category_order()? {
            Some(max) => max + 1,
            None => FIRST_CUSTOM_CATEGORY_ORDER,
        };

        let mut category = Category::new(name, category_type);
        category.description = request.description.unwrap_or_default();
        category.order = order;
        category.is_default = false;
        category.parent_category = request.parent_category;

        self.backend.add_category(&category)?;
        info!(id = %category.id, name = %category.name, order, "category created");
        self.category(&category.id)
    }

    /// Merges the provided fields into a stored category
    pub fn update_category(
        &self,
        id: &Uuid,
        update: CategoryUpdate,
    ) -> CatalogResult<ResolvedCategory> {
        let mut category = self.require_category(id)?;

        if let Some(name) = update.name {
            let name = required("Category name", &name)?;
            self.ensure_name_available(&name, Some(id))?;
            category.name = name;
        }
        if let Some(category_type) = update.category_type {
            category.category_type = required("Category type", &category_type)?;
        }
        if let Some(description) = update.description {
            category.description = description;
        }
        if let Some(order) = update.order {
            category.order = order;
        }
        if let Some(parent) = update.parent_category {
            if let Some(parent_id) = &parent {
                self.ensure_acyclic(id, parent_id)?;
            }
            category.parent_category = parent;
        }
        category.updated_at = Utc::now();

        self.backend.update_category(&category)?;
        info!(id = %category.id, name = %category.name, "category updated");
        self.category(id)
    }

    /// Deletes a category that no command and no subcategory refers to
    pub fn delete_category(&self, id: &Uuid) -> CatalogResult<()> {
        self.require_category(id)?;

        let command_count = self.backend.count_commands_in_category(id)?;
        if command_count > 0 {
            return Err(CatalogError::Conflict(format!(
                "Cannot delete category. It is being used by {} command(s). \
                 Please delete or reassign the commands first.",
                command_count
            )));
        }

        let subcategory_count = self.backend.count_subcategories(id)?;
        if subcategory_count > 0 {
            return Err(CatalogError::Conflict(format!(
                "Cannot delete category. It has {} subcategory(ies). \
                 Please delete the subcategories first.",
                subcategory_count
            )));
        }

        if !self.backend.delete_category(id)? {
            return Err(category_not_found());
        }
        info!(%id, "category deleted");
        Ok(())
    }

    // =========================================================================
    // Command reads
    // =========================================================================

    /// All commands by phase, then order, with categories resolved
    pub fn commands(&self) -> CatalogResult<Vec<ResolvedCommand>> {
        self.commands_where(|_| true)
    }

    pub fn command(&self, id: &Uuid) -> CatalogResult<ResolvedCommand> {
        let command = self.require_command(id)?;
        let category = self.backend.get_category(&command.category)?;
        let lookup = category_lookup(category.as_slice());
        Ok(ResolvedCommand::resolve(command, &lookup))
    }

    pub fn commands_by_category(&self, category: &Uuid) -> CatalogResult<Vec<ResolvedCommand>> {
        self.commands_where(|c| &c.category == category)
    }

    pub fn commands_by_phase(&self, phase: Phase) -> CatalogResult<Vec<ResolvedCommand>> {
        self.commands_where(|c| c.phase == phase)
    }

    pub(crate) fn commands_where<F>(&self, predicate: F) -> CatalogResult<Vec<ResolvedCommand>>
    where
        F: Fn(&Command) -> bool,
    {
        let lookup = category_lookup(&self.backend.list_categories()?);
        let mut commands: Vec<Command> = self
            .backend
            .list_commands()?
            .into_iter()
            .filter(|c| predicate(c))
            .collect();
        sort_commands(&mut commands);
        debug!(count = commands.len(), "listed commands");
        Ok(commands
            .into_iter()
            .map(|c| ResolvedCommand::resolve(c, &lookup))
            .collect())
    }

    // =========================================================================
    // Command writes
    // =========================================================================

    /// Creates a command; without an explicit order it goes last in its scope
    pub fn create_command(&self, request: NewCommand) -> CatalogResult<ResolvedCommand> {
        let name = required("Command name", &request.name)?;
        let template = required("Command template", &request.command)?;
        self.require_referenced_category(&request.category)?;

        let order = match request.order {
            Some(order) => order,
            None => self
                .backend
                .max_command_order(&request.category, request.phase)?
                .map_or(0, |max| max + 1),
        };

        let mut command = Command::new(name, template, request.category, request.phase);
        command.description = request.description.unwrap_or_default();
        command.tags = clean_tags(&request.tags);
        command.order = order;

        self.backend.add_command(&command)?;
        info!(
            id = %command.id,
            name = %command.name,
            phase = %command.phase,
            order,
            "command created"
        );
        self.command(&command.id)
    }

    /// Merges the provided fields into a stored command
    pub fn update_command(&self, id: &Uuid, update: CommandUpdate) -> CatalogResult<ResolvedCommand> {
        let mut command = self.require_command(id)?;

        if let Some(name) = update.name {
            command.name = required("Command name", &name)?;
        }
        if let Some(template) = update.command {
            command.command = required("Command template", &template)?;
        }
        if let Some(description) = update.description {
            command.description = description;
        }
        if let Some(category) = update.category {
            self.require_referenced_category(&category)?;
            command.category = category;
        }
        if let Some(phase) = update.phase {
            command.phase = phase;
        }
        if let Some(tags) = update.tags {
            command.tags = clean_tags(&tags);
        }
        if let Some(order) = update.order {
            command.order = order;
        }
        command.updated_at = Utc::now();

        self.backend.update_command(&command)?;
        info!(id = %command.id, name = %command.name, "command updated");
        self.command(id)
    }

    pub fn delete_command(&self, id: &Uuid) -> CatalogResult<()> {
        if !self.backend.delete_command(id)? {
            return Err(command_not_found());
        }
        info!(%id, "command deleted");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn require_category(&self, id: &Uuid) -> CatalogResult<Category> {
        self.backend
            .get_category(id)?
            .ok_or_else(category_not_found)
    }

    pub(crate) fn require_command(&self, id: &Uuid) -> CatalogResult<Command> {
        self.backend.get_command(id)?.ok_or_else(command_not_found)
    }

    fn require_parent(&self, id: &Uuid) -> CatalogResult<Category> {
        self.backend
            .get_category(id)?
            .ok_or_else(|| CatalogError::not_found("Parent category not found"))
    }

    fn require_referenced_category(&self, id: &Uuid) -> CatalogResult<Category> {
        self.backend
            .get_category(id)?
            .ok_or_else(|| CatalogError::not_found("Selected category not found"))
    }

    fn ensure_name_available(&self, name: &str, except: Option<&Uuid>) -> CatalogResult<()> {
        match self.backend.get_category_by_name(name)? {
            Some(existing) if Some(&existing.id) != except => Err(CatalogError::validation(
                format!("A category named '{}' already exists", name),
            )),
            _ => Ok(()),
        }
    }

    /// Rejects a parent that is the category itself or one of its descendants
    fn ensure_acyclic(&self, id: &Uuid, parent_id: &Uuid) -> CatalogResult<()> {
        if parent_id == id {
            return Err(CatalogError::validation(
                "A category cannot be its own parent",
            ));
        }
        self.require_parent(parent_id)?;

        let lookup = category_lookup(&self.backend.list_categories()?);
        let mut cursor = Some(*parent_id);
        let mut steps = 0;
        while let Some(current) = cursor {
            if &current == id {
                return Err(CatalogError::validation(
                    "Parent category would create a cycle",
                ));
            }
            steps += 1;
            if steps > lookup.len() {
                // Pre-existing cycle above the new parent
                break;
            }
            cursor = lookup.get(&current).and_then(|c| c.parent_category);
        }
        Ok(())
    }
}

fn category_not_found() -> CatalogError {
    CatalogError::not_found("Category not found")
}

fn command_not_found() -> CatalogError {
    CatalogError::not_found("Command not found")
}

/// Trims a required text field, rejecting blank input
fn required(field: &str, value: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{SqliteBackend, YamlBackend};
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    pub(crate) fn memory_catalog() -> Catalog {
        Catalog::new(Box::new(SqliteBackend::in_memory().unwrap()))
    }

    /// A catalog on a YAML file; the file lives as long as the returned dir
    pub(crate) fn yaml_catalog() -> (TempDir, Catalog) {
        let dir = TempDir::new().unwrap();
        let backend = YamlBackend::new(dir.path().join("catalog.yaml"));
        backend.create_if_not_exists().unwrap();
        (dir, Catalog::new(Box::new(backend)))
    }

    /// Runs the same checks against a fresh SQLite and a fresh YAML catalog
    pub(crate) fn on_each_backend(check: impl Fn(&Catalog)) {
        check(&memory_catalog());
        let (_dir, catalog) = yaml_catalog();
        check(&catalog);
    }

    pub(crate) fn new_category(name: &str, category_type: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            category_type: category_type.to_string(),
            description: None,
            parent_category: None,
        }
    }

    pub(crate) fn new_command(name: &str, category: Uuid, phase: Phase) -> NewCommand {
        NewCommand {
            name: name.to_string(),
            command: format!("{} {{domain}}", name.to_lowercase()),
            description: None,
            category,
            phase,
            tags: Vec::new(),
            order: None,
        }
    }

    #[test]
    fn test_first_custom_category_starts_at_100() {
        on_each_backend(|catalog| {
            let created = catalog.create_category(new_category("Cloud", "Cloud")).unwrap();
            assert_eq!(created.order, 100);
            assert!(!created.is_default);
        });
    }

    #[test]
    fn test_custom_category_order_increments_past_max() {
        on_each_backend(|catalog| {
            catalog
                .backend()
                .add_category(&Category::new_default("General", "General", "", 3))
                .unwrap();

            let first = catalog.create_category(new_category("A", "A")).unwrap();
            catalog
                .update_category(
                    &first.id,
                    CategoryUpdate {
                        order: Some(250),
                        ..Default::default()
                    },
                )
                .unwrap();
            let second = catalog.create_category(new_category("B", "B")).unwrap();

            assert_eq!(first.order, 100);
            assert_eq!(second.order, 251);
        });
    }

    #[test]
    fn test_create_category_validation() {
        on_each_backend(|catalog| {
            let err = catalog.create_category(new_category("  ", "General")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);

            catalog.create_category(new_category("Web", "Web")).unwrap();
            let err = catalog.create_category(new_category("Web", "Other")).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);

            let mut orphan = new_category("Orphan", "General");
            orphan.parent_category = Some(Uuid::new_v4());
            let err = catalog.create_category(orphan).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        });
    }

    #[test]
    fn test_categories_sorted_with_parent_resolved() {
        on_each_backend(|catalog| {
            let general = Category::new_default("General", "General", "", 0);
            catalog.backend().add_category(&general).unwrap();
            let mut child = new_category("Child", "Child");
            child.parent_category = Some(general.id);
            catalog.create_category(child).unwrap();
            catalog.create_category(new_category("Another", "Other")).unwrap();

            let categories = catalog.categories().unwrap();
            let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
            assert_eq!(names, vec!["General", "Child", "Another"]);
            assert_eq!(
                categories[1].parent_category.as_ref().map(|p| p.id),
                Some(general.id)
            );
            assert_eq!(catalog.main_categories().unwrap().len(), 2);
            assert_eq!(catalog.subcategories(&general.id).unwrap()[0].name, "Child");
            assert_eq!(catalog.categories_by_type("Other").unwrap().len(), 1);
        });
    }

    #[test]
    fn test_update_category_keeps_omitted_fields() {
        on_each_backend(|catalog| {
            let mut request = new_category("Web", "Web Application");
            request.description = Some("web stuff".to_string());
            let created = catalog.create_category(request).unwrap();

            let updated = catalog
                .update_category(
                    &created.id,
                    CategoryUpdate {
                        order: Some(0),
                        ..Default::default()
                    },
                )
                .unwrap();

            assert_eq!(updated.order, 0);
            assert_eq!(updated.name, "Web");
            assert_eq!(updated.category_type, "Web Application");
            assert_eq!(updated.description, "web stuff");
        });
    }

    #[test]
    fn test_update_category_parent_set_and_clear() {
        on_each_backend(|catalog| {
            let parent = catalog.create_category(new_category("Parent", "P")).unwrap();
            let child = catalog.create_category(new_category("Child", "C")).unwrap();

            let updated = catalog
                .update_category(
                    &child.id,
                    CategoryUpdate {
                        parent_category: Some(Some(parent.id)),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(updated.parent_category.map(|p| p.id), Some(parent.id));

            let kept = catalog
                .update_category(
                    &child.id,
                    CategoryUpdate {
                        description: Some("d".to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert!(kept.parent_category.is_some());

            let cleared = catalog
                .update_category(
                    &child.id,
                    CategoryUpdate {
                        parent_category: Some(None),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert!(cleared.parent_category.is_none());
        });
    }

    #[test]
    fn test_update_category_rejects_cycles() {
        on_each_backend(|catalog| {
            let root = catalog.create_category(new_category("Root", "R")).unwrap();
            let mut child = new_category("Child", "C");
            child.parent_category = Some(root.id);
            let child = catalog.create_category(child).unwrap();

            let self_parent = catalog
                .update_category(
                    &root.id,
                    CategoryUpdate {
                        parent_category: Some(Some(root.id)),
                        ..Default::default()
                    },
                )
                .unwrap_err();
            assert_eq!(self_parent.kind(), ErrorKind::BadRequest);

            let cycle = catalog
                .update_category(
                    &root.id,
                    CategoryUpdate {
                        parent_category: Some(Some(child.id)),
                        ..Default::default()
                    },
                )
                .unwrap_err();
            assert_eq!(cycle.kind(), ErrorKind::BadRequest);
        });
    }

    #[test]
    fn test_update_unknown_category_is_not_found() {
        on_each_backend(|catalog| {
            let err = catalog
                .update_category(&Uuid::new_v4(), CategoryUpdate::default())
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        });
    }

    #[test]
    fn test_delete_category_blocked_by_commands() {
        on_each_backend(|catalog| {
            let category = catalog.create_category(new_category("Web", "Web")).unwrap();
            catalog
                .create_command(new_command("Nikto", category.id, Phase::Scanning))
                .unwrap();
            catalog
                .create_command(new_command("Gobuster", category.id, Phase::Enumeration))
                .unwrap();

            let err = catalog.delete_category(&category.id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert!(err.to_string().contains("2 command(s)"));
            assert!(catalog.category(&category.id).is_ok());
        });
    }

    #[test]
    fn test_delete_category_blocked_by_subcategories() {
        on_each_backend(|catalog| {
            let parent = catalog.create_category(new_category("Parent", "P")).unwrap();
            let mut child = new_category("Child", "C");
            child.parent_category = Some(parent.id);
            catalog.create_category(child).unwrap();

            let err = catalog.delete_category(&parent.id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert!(err.to_string().contains("1 subcategory(ies)"));
            assert!(catalog.category(&parent.id).is_ok());
        });
    }

    #[test]
    fn test_delete_category() {
        on_each_backend(|catalog| {
            let category = catalog.create_category(new_category("Temp", "T")).unwrap();
            catalog.delete_category(&category.id).unwrap();

            let err = catalog.delete_category(&category.id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        });
    }

    #[test]
    fn test_create_command_appends_within_scope() {
        on_each_backend(|catalog| {
            let category = catalog.create_category(new_category("Web", "Web")).unwrap();

            let first = catalog
                .create_command(new_command("One", category.id, Phase::Scanning))
                .unwrap();
            let second = catalog
                .create_command(new_command("Two", category.id, Phase::Scanning))
                .unwrap();
            let other_phase = catalog
                .create_command(new_command("Three", category.id, Phase::Reporting))
                .unwrap();

            assert_eq!(first.order, 0);
            assert_eq!(second.order, 1);
            assert_eq!(other_phase.order, 0);
            assert_eq!(
                second.category.map(|c| c.id),
                Some(category.id)
            );
        });
    }

    #[test]
    fn test_create_command_validation() {
        on_each_backend(|catalog| {
            let err = catalog
                .create_command(new_command("Nmap", Uuid::new_v4(), Phase::Scanning))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);

            let category = catalog.create_category(new_category("Web", "Web")).unwrap();
            let mut blank = new_command("Nmap", category.id, Phase::Scanning);
            blank.command = "   ".to_string();
            let err = catalog.create_command(blank).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest);
        });
    }

    #[test]
    fn test_update_command_partial_merge() {
        on_each_backend(|catalog| {
            let category = catalog.create_category(new_category("Web", "Web")).unwrap();
            let mut request = new_command("Nmap", category.id, Phase::Scanning);
            request.tags = vec!["nmap".to_string(), " ".to_string()];
            request.order = Some(4);
            let created = catalog.create_command(request).unwrap();
            assert_eq!(created.tags, vec!["nmap".to_string()]);

            let updated = catalog
                .update_command(
                    &created.id,
                    CommandUpdate {
                        phase: Some(Phase::Enumeration),
                        order: Some(0),
                        ..Default::default()
                    },
                )
                .unwrap();

            assert_eq!(updated.phase, Phase::Enumeration);
            assert_eq!(updated.order, 0);
            assert_eq!(updated.name, "Nmap");
            assert_eq!(updated.command, created.command);
            assert_eq!(updated.tags, created.tags);
        });
    }

    #[test]
    fn test_commands_filters_and_sorting() {
        on_each_backend(|catalog| {
            let web = catalog.create_category(new_category("Web", "Web")).unwrap();
            let net = catalog.create_category(new_category("Net", "Net")).unwrap();
            catalog
                .create_command(new_command("Report", web.id, Phase::Reporting))
                .unwrap();
            catalog
                .create_command(new_command("Recon", net.id, Phase::Reconnaissance))
                .unwrap();
            catalog
                .create_command(new_command("Scan", web.id, Phase::Scanning))
                .unwrap();

            let names: Vec<_> = catalog
                .commands()
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect();
            assert_eq!(names, vec!["Recon", "Scan", "Report"]);
            assert_eq!(catalog.commands_by_category(&web.id).unwrap().len(), 2);
            assert_eq!(catalog.commands_by_phase(Phase::Scanning).unwrap().len(), 1);
        });
    }

    #[test]
    fn test_delete_command() {
        on_each_backend(|catalog| {
            let category = catalog.create_category(new_category("Web", "Web")).unwrap();
            let command = catalog
                .create_command(new_command("Nmap", category.id, Phase::Scanning))
                .unwrap();

            catalog.delete_command(&command.id).unwrap();
            let err = catalog.delete_command(&command.id).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
            catalog.delete_category(&category.id).unwrap();
        });
    }

    #[test]
    fn test_concurrent_creates_on_yaml_are_all_stored() {
        let (_dir, catalog) = yaml_catalog();
        let category = catalog.create_category(new_category("Web", "Web")).unwrap();

        std::thread::scope(|scope| {
            for i in 0..16 {
                let catalog = &catalog;
                let category = category.id;
                scope.spawn(move || {
                    catalog
                        .create_command(new_command(&format!("Tool {}", i), category, Phase::Scanning))
                        .unwrap();
                });
            }
        });

        assert_eq!(catalog.commands_by_category(&category.id).unwrap().len(), 16);
    }

    #[test]
    fn test_concurrent_updates_on_yaml_are_all_stored() {
        let (_dir, catalog) = yaml_catalog();
        let category = catalog.create_category(new_category("Web", "Web")).unwrap();
        let ids: Vec<Uuid> = (0..8)
            .map(|i| {
                catalog
                    .create_command(new_command(&format!("Tool {}", i), category.id, Phase::Scanning))
                    .unwrap()
                    .id
            })
            .collect();

        std::thread::scope(|scope| {
            for id in &ids {
                let catalog = &catalog;
                scope.spawn(move || {
                    catalog
                        .update_command(
                            id,
                            CommandUpdate {
                                description: Some("updated".to_string()),
                                ..Default::default()
                            },
                        )
                        .unwrap();
                });
            }
        });

        for id in &ids {
            assert_eq!(catalog.command(id).unwrap().description, "updated");
        }
    }
}
