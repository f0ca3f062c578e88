use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Order assigned to the first user-created category
pub const FIRST_CUSTOM_CATEGORY_ORDER: i64 = 100;

/// Stage of a testing workflow a command belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Reconnaissance,
    Scanning,
    Enumeration,
    Exploitation,
    #[serde(rename = "Post-Exploitation")]
    PostExploitation,
    Reporting,
}

impl Phase {
    /// All phases in workflow order
    pub const ALL: [Phase; 6] = [
        Phase::Reconnaissance,
        Phase::Scanning,
        Phase::Enumeration,
        Phase::Exploitation,
        Phase::PostExploitation,
        Phase::Reporting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Reconnaissance => "Reconnaissance",
            Phase::Scanning => "Scanning",
            Phase::Enumeration => "Enumeration",
            Phase::Exploitation => "Exploitation",
            Phase::PostExploitation => "Post-Exploitation",
            Phase::Reporting => "Reporting",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    /// Accepts the display name in any case; `post_exploitation` and
    /// `postexploitation` are accepted as well for command-line use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect();
        match normalized.as_str() {
            "reconnaissance" | "recon" => Ok(Phase::Reconnaissance),
            "scanning" => Ok(Phase::Scanning),
            "enumeration" => Ok(Phase::Enumeration),
            "exploitation" => Ok(Phase::Exploitation),
            "postexploitation" => Ok(Phase::PostExploitation),
            "reporting" => Ok(Phase::Reporting),
            _ => Err(format!(
                "Invalid phase '{}'. Valid phases: {}",
                s,
                Phase::ALL.map(|p| p.as_str()).join(", ")
            )),
        }
    }
}

/// A grouping entity for commands, optionally nested under a parent category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    /// Unique across all categories
    pub name: String,
    /// Display grouping key; several categories may share a type
    #[serde(rename = "type")]
    pub category_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: i64,
    /// Seeded categories are flagged as defaults and listed first
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub parent_category: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates a new user category with a fresh id
    pub fn new(name: String, category_type: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            category_type,
            description: String::new(),
            order: 0,
            is_default: false,
            parent_category: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a seeded default category at the given position
    pub fn new_default(name: &str, category_type: &str, description: &str, order: i64) -> Self {
        let mut category = Self::new(name.to_string(), category_type.to_string());
        category.description = description.to_string();
        category.order = order;
        category.is_default = true;
        category
    }
}

/// A command template belonging to a category and a phase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    pub id: Uuid,
    pub name: String,
    /// Template text containing `{domain}`-style placeholders
    pub command: String,
    #[serde(default)]
    pub description: String,
    pub category: Uuid,
    pub phase: Phase,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Position within the (category, phase) grouping
    #[serde(default)]
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Command {
    pub fn new(name: String, command: String, category: Uuid, phase: Phase) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            command,
            description: String::new(),
            category,
            phase,
            tags: Vec::new(),
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The whole catalog as held by a storage backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatalogStore {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_category(&self, id: &Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    pub fn get_category_mut(&mut self, id: &Uuid) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| &c.id == id)
    }

    pub fn get_command(&self, id: &Uuid) -> Option<&Command> {
        self.commands.iter().find(|c| &c.id == id)
    }

    pub fn get_command_mut(&mut self, id: &Uuid) -> Option<&mut Command> {
        self.commands.iter_mut().find(|c| &c.id == id)
    }

    /// Categories without a parent
    pub fn main_categories(&self) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.parent_category.is_none())
            .collect()
    }

    /// Direct children of `parent`
    pub fn subcategories(&self, parent: &Uuid) -> Vec<&Category> {
        self.categories
            .iter()
            .filter(|c| c.parent_category.as_ref() == Some(parent))
            .collect()
    }

    pub fn count_commands_in_category(&self, category: &Uuid) -> usize {
        self.commands.iter().filter(|c| &c.category == category).count()
    }

    /// Highest order among user-created categories
    pub fn max_custom_category_order(&self) -> Option<i64> {
        self.categories
            .iter()
            .filter(|c| !c.is_default)
            .map(|c| c.order)
            .max()
    }

    /// Highest order within a (category, phase) scope
    pub fn max_command_order(&self, category: &Uuid, phase: Phase) -> Option<i64> {
        self.commands
            .iter()
            .filter(|c| &c.category == category && c.phase == phase)
            .map(|c| c.order)
            .max()
    }

    /// Fails when two categories share a name
    pub fn validate_unique_names(&self) -> anyhow::Result<()> {
        let mut seen: HashMap<&str, Uuid> = HashMap::new();
        for category in &self.categories {
            if let Some(other) = seen.insert(category.name.as_str(), category.id) {
                anyhow::bail!(
                    "Duplicate category name '{}' ({} and {})",
                    category.name,
                    other,
                    category.id
                );
            }
        }
        Ok(())
    }
}

/// Sorts categories default-first, then by order, then by name
pub fn sort_categories(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then(a.order.cmp(&b.order))
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// Sorts commands by phase (workflow order), then by order, then by name
pub fn sort_commands(commands: &mut [Command]) {
    commands.sort_by(|a, b| {
        a.phase
            .cmp(&b.phase)
            .then(a.order.cmp(&b.order))
            .then_with(|| a.name.cmp(&b.name))
    });
}

// =========================================================================
// Request payloads
// =========================================================================

/// Payload for creating a category
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_id")]
    pub parent_category: Option<Uuid>,
}

/// Partial update of a category; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub category_type: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
    /// `Some(None)` clears the parent, `None` keeps it
    #[serde(default, deserialize_with = "optional_id_patch")]
    pub parent_category: Option<Option<Uuid>>,
}

/// Payload for creating a command
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommand {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Uuid,
    pub phase: Phase,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Placed last in its (category, phase) scope when absent
    #[serde(default)]
    pub order: Option<i64>,
}

/// Partial update of a command; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandUpdate {
    pub name: Option<String>,
    pub command: Option<String>,
    pub description: Option<String>,
    pub category: Option<Uuid>,
    pub phase: Option<Phase>,
    pub tags: Option<Vec<String>>,
    pub order: Option<i64>,
}

/// One entry of a reorder batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderUpdate {
    pub id: Uuid,
    pub order: i64,
}

/// Trims tags and drops the empty ones
pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Web forms send `""` for "no parent"
fn optional_id<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn optional_id_patch<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_id(deserializer).map(Some)
}

// =========================================================================
// Resolved records (references embedded)
// =========================================================================

/// A category with its parent embedded
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub description: String,
    pub order: i64,
    pub is_default: bool,
    pub parent_category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolvedCategory {
    pub fn resolve(category: Category, lookup: &HashMap<Uuid, Category>) -> Self {
        let parent_category = category
            .parent_category
            .as_ref()
            .and_then(|id| lookup.get(id))
            .cloned();
        Self {
            id: category.id,
            name: category.name,
            category_type: category.category_type,
            description: category.description,
            order: category.order,
            is_default: category.is_default,
            parent_category,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

/// A command with its category embedded (`null` when the reference dangles)
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCommand {
    pub id: Uuid,
    pub name: String,
    pub command: String,
    pub description: String,
    pub category: Option<Category>,
    pub phase: Phase,
    pub tags: Vec<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResolvedCommand {
    pub fn resolve(command: Command, lookup: &HashMap<Uuid, Category>) -> Self {
        let category = lookup.get(&command.category).cloned();
        Self {
            id: command.id,
            name: command.name,
            command: command.command,
            description: command.description,
            category,
            phase: command.phase,
            tags: command.tags,
            order: command.order,
            created_at: command.created_at,
            updated_at: command.updated_at,
        }
    }

    /// Type of the embedded category, if resolved
    pub fn category_type(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.category_type.as_str())
    }
}

/// Builds an id lookup table for reference resolution
pub fn category_lookup(categories: &[Category]) -> HashMap<Uuid, Category> {
    categories.iter().map(|c| (c.id, c.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_round_trips_display_names() {
        for phase in Phase::ALL {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert_eq!(
            "post_exploitation".parse::<Phase>().unwrap(),
            Phase::PostExploitation
        );
        assert!("Pivoting".parse::<Phase>().is_err());
    }

    #[test]
    fn test_phase_serializes_with_hyphen() {
        let json = serde_json::to_string(&Phase::PostExploitation).unwrap();
        assert_eq!(json, "\"Post-Exploitation\"");
    }

    #[test]
    fn test_category_wire_shape() {
        let category = Category::new("Web".to_string(), "Web Application".to_string());
        let value = serde_json::to_value(&category).unwrap();
        assert_eq!(value["type"], "Web Application");
        assert_eq!(value["isDefault"], false);
        assert!(value["parentCategory"].is_null());
    }

    #[test]
    fn test_sort_categories_default_first() {
        let mut custom = Category::new("Alpha".to_string(), "General".to_string());
        custom.order = 0;
        let default_b = Category::new_default("Beta", "General", "", 1);
        let default_a = Category::new_default("Alpha Default", "General", "", 1);
        let mut categories = vec![custom, default_b, default_a];

        sort_categories(&mut categories);

        let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha Default", "Beta", "Alpha"]);
    }

    #[test]
    fn test_sort_commands_by_phase_then_order() {
        let category = Uuid::new_v4();
        let mut report = Command::new("r".into(), "r".into(), category, Phase::Reporting);
        report.order = 0;
        let mut scan_late = Command::new("s2".into(), "s".into(), category, Phase::Scanning);
        scan_late.order = 5;
        let mut scan_early = Command::new("s1".into(), "s".into(), category, Phase::Scanning);
        scan_early.order = 1;
        let mut commands = vec![report, scan_late, scan_early];

        sort_commands(&mut commands);

        let names: Vec<_> = commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["s1", "s2", "r"]);
    }

    #[test]
    fn test_category_update_distinguishes_null_from_absent() {
        let absent: CategoryUpdate = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(absent.parent_category, None);

        let cleared: CategoryUpdate = serde_json::from_str(r#"{"parentCategory": null}"#).unwrap();
        assert_eq!(cleared.parent_category, Some(None));

        let empty: CategoryUpdate = serde_json::from_str(r#"{"parentCategory": ""}"#).unwrap();
        assert_eq!(empty.parent_category, Some(None));

        let zero: CategoryUpdate = serde_json::from_str(r#"{"order": 0}"#).unwrap();
        assert_eq!(zero.order, Some(0));
    }

    #[test]
    fn test_new_category_accepts_empty_parent() {
        let req: NewCategory =
            serde_json::from_str(r#"{"name": "n", "type": "t", "parentCategory": ""}"#).unwrap();
        assert_eq!(req.parent_category, None);
    }

    #[test]
    fn test_clean_tags() {
        assert_eq!(
            clean_tags([" nmap ", "", "  ", "dns"]),
            vec!["nmap".to_string(), "dns".to_string()]
        );
    }

    #[test]
    fn test_validate_unique_names() {
        let mut store = CatalogStore::new();
        store
            .categories
            .push(Category::new("Dup".to_string(), "General".to_string()));
        assert!(store.validate_unique_names().is_ok());
        store
            .categories
            .push(Category::new("Dup".to_string(), "Other".to_string()));
        assert!(store.validate_unique_names().is_err());
    }
}
