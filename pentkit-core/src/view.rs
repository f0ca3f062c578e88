//! Client session state for browsing the catalog
//!
//! `ViewState` holds everything a front end needs between requests: the
//! category type on screen, which dialog is open, form drafts, generator
//! inputs and the transient notice banner.

use std::collections::HashSet;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::generator::{GeneratorInputs, Placeholder};
use crate::models::{
    clean_tags, CommandUpdate, NewCategory, NewCommand, Phase, ResolvedCommand,
};

pub const DEFAULT_CATEGORY_TYPE: &str = "General";
pub const SUCCESS_NOTICE_TTL: Duration = Duration::from_secs(3);
pub const ERROR_NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    None,
    AddCategory,
    ManageCategories,
    AddCommand,
    EditCommand(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

/// Form state for the add-category dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub category_type: String,
    pub description: String,
    pub parent_category: Option<Uuid>,
}

impl Default for CategoryDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            category_type: DEFAULT_CATEGORY_TYPE.to_string(),
            description: String::new(),
            parent_category: None,
        }
    }
}

impl CategoryDraft {
    pub fn to_request(&self) -> NewCategory {
        NewCategory {
            name: self.name.clone(),
            category_type: self.category_type.clone(),
            description: Some(self.description.clone()),
            parent_category: self.parent_category,
        }
    }
}

/// Form state for the add/edit command dialogs; tags are comma separated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDraft {
    pub name: String,
    pub command: String,
    pub description: String,
    pub category: Option<Uuid>,
    pub phase: Phase,
    pub tags: String,
}

impl Default for CommandDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            description: String::new(),
            category: None,
            phase: Phase::Reconnaissance,
            tags: String::new(),
        }
    }
}

impl CommandDraft {
    pub fn from_command(command: &ResolvedCommand) -> Self {
        Self {
            name: command.name.clone(),
            command: command.command.clone(),
            description: command.description.clone(),
            category: command.category.as_ref().map(|c| c.id),
            phase: command.phase,
            tags: command.tags.join(", "),
        }
    }

    fn split_tags(&self) -> Vec<String> {
        clean_tags(self.tags.split(','))
    }

    fn require_category(&self) -> CatalogResult<Uuid> {
        self.category
            .ok_or_else(|| CatalogError::validation("Name, command, and category are required"))
    }

    pub fn to_request(&self) -> CatalogResult<NewCommand> {
        Ok(NewCommand {
            name: self.name.clone(),
            command: self.command.clone(),
            description: Some(self.description.clone()),
            category: self.require_category()?,
            phase: self.phase,
            tags: self.split_tags(),
            order: None,
        })
    }

    pub fn to_update(&self) -> CatalogResult<CommandUpdate> {
        Ok(CommandUpdate {
            name: Some(self.name.clone()),
            command: Some(self.command.clone()),
            description: Some(self.description.clone()),
            category: Some(self.require_category()?),
            phase: Some(self.phase),
            tags: Some(self.split_tags()),
            order: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub active_type: String,
    pub dialog: Dialog,
    pub category_draft: CategoryDraft,
    pub command_draft: CommandDraft,
    pub generator_inputs: GeneratorInputs,
    pub search_query: String,
    pub notice: Option<Notice>,
    pub collapsed: HashSet<Uuid>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            active_type: DEFAULT_CATEGORY_TYPE.to_string(),
            dialog: Dialog::None,
            category_draft: CategoryDraft::default(),
            command_draft: CommandDraft::default(),
            generator_inputs: GeneratorInputs::default(),
            search_query: String::new(),
            notice: None,
            collapsed: HashSet::new(),
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_type(&mut self, category_type: impl Into<String>) {
        self.active_type = category_type.into();
    }

    pub fn open_dialog(&mut self, dialog: Dialog) {
        self.dialog = dialog;
    }

    /// Closes the open dialog and discards its draft
    pub fn close_dialog(&mut self) {
        match self.dialog {
            Dialog::AddCategory | Dialog::ManageCategories => {
                self.category_draft = CategoryDraft::default();
            }
            Dialog::AddCommand | Dialog::EditCommand(_) => {
                self.command_draft = CommandDraft::default();
            }
            Dialog::None => {}
        }
        self.dialog = Dialog::None;
    }

    /// Opens the edit dialog with the draft filled from `command`
    pub fn begin_edit_command(&mut self, command: &ResolvedCommand) {
        self.command_draft = CommandDraft::from_command(command);
        self.dialog = Dialog::EditCommand(command.id);
    }

    /// Returns true when the category is now collapsed
    pub fn toggle_collapsed(&mut self, category: Uuid) -> bool {
        if self.collapsed.remove(&category) {
            false
        } else {
            self.collapsed.insert(category);
            true
        }
    }

    pub fn is_collapsed(&self, category: &Uuid) -> bool {
        self.collapsed.contains(category)
    }

    pub fn set_generator_input(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.generator_inputs.set(placeholder, value);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    pub fn is_searching(&self) -> bool {
        !self.search_query.trim().is_empty()
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) {
        let ttl = match level {
            NoticeLevel::Success => SUCCESS_NOTICE_TTL,
            NoticeLevel::Error => ERROR_NOTICE_TTL,
        };
        self.notice = Some(Notice {
            level,
            message: message.into(),
            expires_at: now + ttl,
        });
    }

    /// Shows an error notice for a failed operation
    pub fn notify_error(&mut self, error: &CatalogError, now: Instant) {
        self.notify(NoticeLevel::Error, error.to_string(), now);
    }

    /// Drops the notice once it has expired
    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
        }
    }
}

/// Commands of the active type, bucketed by phase in workflow order
///
/// Empty phases are omitted. Each bucket is sorted by `order`.
pub fn group_by_phase<'a>(
    commands: &'a [ResolvedCommand],
    active_type: &str,
) -> Vec<(Phase, Vec<&'a ResolvedCommand>)> {
    Phase::ALL
        .iter()
        .filter_map(|phase| {
            let mut bucket: Vec<&ResolvedCommand> = commands
                .iter()
                .filter(|c| c.phase == *phase && c.category_type() == Some(active_type))
                .collect();
            if bucket.is_empty() {
                return None;
            }
            bucket.sort_by_key(|c| c.order);
            Some((*phase, bucket))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{category_lookup, Category, Command};

    fn resolved(name: &str, category: &Category, phase: Phase, order: i64) -> ResolvedCommand {
        let mut command = Command::new(name.into(), "echo".into(), category.id, phase);
        command.order = order;
        command.tags = vec!["a".to_string(), "b".to_string()];
        ResolvedCommand::resolve(command, &category_lookup(std::slice::from_ref(category)))
    }

    #[test]
    fn test_defaults() {
        let view = ViewState::new();
        assert_eq!(view.active_type, "General");
        assert_eq!(view.dialog, Dialog::None);
        assert_eq!(view.command_draft.phase, Phase::Reconnaissance);
        assert_eq!(view.category_draft.category_type, "General");
    }

    #[test]
    fn test_close_dialog_resets_draft() {
        let mut view = ViewState::new();
        view.open_dialog(Dialog::AddCategory);
        view.category_draft.name = "Cloud".to_string();
        view.close_dialog();
        assert_eq!(view.dialog, Dialog::None);
        assert!(view.category_draft.name.is_empty());
    }

    #[test]
    fn test_begin_edit_command_fills_draft() {
        let category = Category::new("Web".into(), "Web".into());
        let command = resolved("Nikto", &category, Phase::Scanning, 0);
        let mut view = ViewState::new();

        view.begin_edit_command(&command);

        assert_eq!(view.dialog, Dialog::EditCommand(command.id));
        assert_eq!(view.command_draft.name, "Nikto");
        assert_eq!(view.command_draft.tags, "a, b");
        assert_eq!(view.command_draft.category, Some(category.id));

        let update = view.command_draft.to_update().unwrap();
        assert_eq!(update.tags, Some(vec!["a".to_string(), "b".to_string()]));
        view.close_dialog();
        assert_eq!(view.command_draft, CommandDraft::default());
    }

    #[test]
    fn test_command_draft_requires_category() {
        let draft = CommandDraft {
            name: "x".into(),
            command: "y".into(),
            ..Default::default()
        };
        assert!(draft.to_request().is_err());
    }

    #[test]
    fn test_toggle_collapsed() {
        let mut view = ViewState::new();
        let id = Uuid::new_v4();
        assert!(view.toggle_collapsed(id));
        assert!(view.is_collapsed(&id));
        assert!(!view.toggle_collapsed(id));
        assert!(!view.is_collapsed(&id));
    }

    #[test]
    fn test_notice_expiry() {
        let mut view = ViewState::new();
        let start = Instant::now();

        view.notify(NoticeLevel::Success, "Saved", start);
        view.tick(start + Duration::from_secs(2));
        assert!(view.notice.is_some());
        view.tick(start + Duration::from_secs(3));
        assert!(view.notice.is_none());

        view.notify_error(&CatalogError::not_found("gone"), start);
        view.tick(start + Duration::from_secs(4));
        assert_eq!(view.notice.as_ref().map(|n| n.level), Some(NoticeLevel::Error));
        view.tick(start + Duration::from_secs(5));
        assert!(view.notice.is_none());
    }

    #[test]
    fn test_inputs_and_search_query() {
        let mut view = ViewState::new();
        view.set_generator_input(Placeholder::Ports, "22");
        assert_eq!(view.generator_inputs.ports, "22");
        assert!(!view.is_searching());
        view.set_search_query("nmap");
        assert!(view.is_searching());
        view.select_type("Web");
        assert_eq!(view.active_type, "Web");
    }

    #[test]
    fn test_group_by_phase() {
        let web = Category::new("Web".into(), "Web".into());
        let net = Category::new("Net".into(), "Network".into());
        let commands = vec![
            resolved("late", &web, Phase::Scanning, 2),
            resolved("report", &web, Phase::Reporting, 0),
            resolved("early", &web, Phase::Scanning, 1),
            resolved("other", &net, Phase::Scanning, 0),
        ];

        let groups = group_by_phase(&commands, "Web");

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Phase::Scanning);
        let names: Vec<_> = groups[0].1.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
        assert_eq!(groups[1].0, Phase::Reporting);
    }
}
