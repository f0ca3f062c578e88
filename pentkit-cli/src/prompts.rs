use anyhow::{Context, Result};
use inquire::{Select, Text};
use uuid::Uuid;

use pentkit_core::view::{CategoryDraft, CommandDraft, ViewState};
use pentkit_core::{CommandUpdate, NewCategory, NewCommand, Phase, ResolvedCategory, ResolvedCommand};

const NO_PARENT: &str = "(none)";

fn category_label(category: &ResolvedCategory) -> String {
    format!("{} [{}]", category.name, category.category_type)
}

/// Prompts the user to pick a category
pub fn prompt_select_category(
    message: &str,
    categories: &[ResolvedCategory],
    current: Option<Uuid>,
) -> Result<Uuid> {
    if categories.is_empty() {
        anyhow::bail!("No categories found. Add one with 'pentkit category add'");
    }
    let options: Vec<String> = categories.iter().map(category_label).collect();
    let start = current
        .and_then(|id| categories.iter().position(|c| c.id == id))
        .unwrap_or(0);

    let selection = Select::new(message, options.clone())
        .with_starting_cursor(start)
        .prompt()?;

    let index = options
        .iter()
        .position(|o| o == &selection)
        .context("Selected category not found")?;
    Ok(categories[index].id)
}

fn prompt_phase(current: Phase) -> Result<Phase> {
    let start = Phase::ALL.iter().position(|p| *p == current).unwrap_or(0);
    let phase = Select::new("Phase:", Phase::ALL.to_vec())
        .with_starting_cursor(start)
        .prompt()?;
    Ok(phase)
}

/// Prompts the user for a new category
pub fn prompt_new_category(categories: &[ResolvedCategory]) -> Result<NewCategory> {
    let mut draft = CategoryDraft::default();
    draft.name = Text::new("Name:").prompt()?;
    draft.category_type = Text::new("Type:")
        .with_default(&draft.category_type)
        .prompt()?;
    draft.description = Text::new("Description:").prompt()?;

    let mut parent_options = vec![NO_PARENT.to_string()];
    parent_options.extend(categories.iter().map(category_label));
    let selection = Select::new("Parent category:", parent_options.clone()).prompt()?;
    draft.parent_category = parent_options
        .iter()
        .position(|o| o == &selection)
        .filter(|index| *index > 0)
        .map(|index| categories[index - 1].id);

    Ok(draft.to_request())
}

fn fill_command_draft(draft: &mut CommandDraft, categories: &[ResolvedCategory]) -> Result<()> {
    draft.name = Text::new("Name:").with_default(&draft.name).prompt()?;
    draft.command = Text::new("Command template:")
        .with_default(&draft.command)
        .with_help_message("Placeholders: {domain} {ip/range} {ports} {filename}")
        .prompt()?;
    draft.description = Text::new("Description:")
        .with_default(&draft.description)
        .prompt()?;
    draft.category = Some(prompt_select_category("Category:", categories, draft.category)?);
    draft.phase = prompt_phase(draft.phase)?;
    draft.tags = Text::new("Tags (comma separated):")
        .with_default(&draft.tags)
        .prompt()?;
    Ok(())
}

/// Prompts the user for a new command
pub fn prompt_new_command(categories: &[ResolvedCategory]) -> Result<NewCommand> {
    let mut draft = CommandDraft::default();
    fill_command_draft(&mut draft, categories)?;
    Ok(draft.to_request()?)
}

/// Prompts for every field of an existing command, prefilled with its values
pub fn prompt_edit_command(
    command: &ResolvedCommand,
    categories: &[ResolvedCategory],
) -> Result<CommandUpdate> {
    let mut view = ViewState::new();
    view.begin_edit_command(command);
    fill_command_draft(&mut view.command_draft, categories)?;
    let update = view.command_draft.to_update()?;
    view.close_dialog();
    Ok(update)
}
