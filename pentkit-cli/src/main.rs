mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use uuid::Uuid;

use pentkit_core::db::{self, copy_catalog, export_backend_to_json, import_json_to_backend};
use pentkit_core::generator::{self, GenerateRequest, GeneratorInputs};
use pentkit_core::view::group_by_phase;
use pentkit_core::{
    config_path, contiguous_orders, logging, move_item, Catalog, CategoryUpdate, CommandUpdate,
    Config, NewCategory, NewCommand, Phase, ResolvedCategory, ResolvedCommand,
};

use crate::cli::{CategoryCommand, Cli, CmdCommand, Command, DbCommand};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    logging::init_with_filter(config.log_format, "warn");
    tracing::debug!(catalog = %config.catalog_path.display(), "configuration loaded");

    let catalog = Catalog::from_config(&config.database())?;

    match &cli.command {
        Command::Category(cmd) => handle_category_command(cmd, &catalog)?,
        Command::Cmd(cmd) => handle_cmd_command(cmd, &catalog)?,
        Command::Generate {
            domain,
            ip_range,
            ports,
            filename,
            category,
            phase,
            r#type,
        } => {
            let inputs = GeneratorInputs {
                domain: domain.clone().unwrap_or_default(),
                ip_range: ip_range.clone().unwrap_or_default(),
                ports: ports.clone().unwrap_or_default(),
                filename: filename.clone().unwrap_or_default(),
            };
            generate_commands(&catalog, inputs, category, phase, r#type)?;
        }
        Command::Search { query, scores } => search_commands(&catalog, query, *scores)?,
        Command::Db(cmd) => handle_db_command(cmd, &catalog)?,
        Command::Config => show_config(&cli, &config)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_path()?,
    };
    let mut config = Config::load_or_create(&path)?;
    config.apply_env();

    if let Some(db) = &cli.db {
        config.catalog_path = db.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = Some(backend);
    }
    Ok(config)
}

fn show_config(cli: &Cli, config: &Config) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config_path()?,
    };
    let database = config.database();
    println!("Config file: {}", path.display());
    println!("Catalog:     {}", database.path.display());
    println!("Backend:     {}", database.backend_type);
    println!("Bind:        {}", config.bind);
    println!("Log format:  {}", config.log_format);
    Ok(())
}

// =========================================================================
// Lookups
// =========================================================================

fn parse_phase(s: &str) -> Result<Phase> {
    s.parse::<Phase>().map_err(anyhow::Error::msg)
}

/// Finds a category by UUID or exact name
fn resolve_category(catalog: &Catalog, key: &str) -> Result<ResolvedCategory> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(catalog.category(&id)?);
    }
    let category = catalog
        .backend()
        .get_category_by_name(key)?
        .with_context(|| format!("Category '{}' not found", key))?;
    Ok(catalog.category(&category.id)?)
}

/// Finds a command by UUID or by (case-insensitive) name
fn resolve_command(catalog: &Catalog, key: &str) -> Result<ResolvedCommand> {
    if let Ok(id) = Uuid::parse_str(key) {
        return Ok(catalog.command(&id)?);
    }
    let mut matches: Vec<ResolvedCommand> = catalog
        .commands()?
        .into_iter()
        .filter(|c| c.name.eq_ignore_ascii_case(key))
        .collect();
    match matches.len() {
        0 => anyhow::bail!("Command '{}' not found", key),
        1 => Ok(matches.remove(0)),
        n => anyhow::bail!("{} commands are named '{}'; use the UUID instead", n, key),
    }
}

fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',').map(|t| t.to_string()).collect()
}

fn confirm(message: &str) -> Result<bool> {
    Ok(inquire::Confirm::new(message)
        .with_default(false)
        .prompt()?)
}

// =========================================================================
// Categories
// =========================================================================

fn handle_category_command(cmd: &CategoryCommand, catalog: &Catalog) -> Result<()> {
    match cmd {
        CategoryCommand::List { r#type, tree } => {
            if *tree {
                print_category_tree(catalog)?;
            } else {
                list_categories(catalog, r#type.as_deref())?;
            }
        }
        CategoryCommand::Show { id } => {
            let category = resolve_category(catalog, id)?;
            let commands = catalog.commands_by_category(&category.id)?;
            let children = catalog.subcategories(&category.id)?;

            println!("{}", category.name.bold());
            println!("  UUID:        {}", category.id);
            println!("  Type:        {}", category.category_type);
            println!("  Order:       {}", category.order);
            println!("  Default:     {}", category.is_default);
            if let Some(parent) = &category.parent_category {
                println!("  Parent:      {}", parent.name);
            }
            if !category.description.is_empty() {
                println!("  Description: {}", category.description);
            }
            println!("  Commands:    {}", commands.len());
            println!("  Subcategories: {}", children.len());
        }
        CategoryCommand::Add {
            name,
            r#type,
            description,
            parent,
            interactive,
        } => {
            let request = if *interactive || (name.is_none() && r#type.is_none()) {
                prompts::prompt_new_category(&catalog.categories()?)?
            } else {
                let name = name
                    .clone()
                    .context("Name is required. Use --name to specify a name.")?;
                let category_type = r#type
                    .clone()
                    .context("Type is required. Use --type to specify a type.")?;
                let parent_category = match parent {
                    Some(key) => Some(resolve_category(catalog, key)?.id),
                    None => None,
                };
                NewCategory {
                    name,
                    category_type,
                    description: description.clone(),
                    parent_category,
                }
            };

            let created = catalog.create_category(request)?;
            println!("{}", "Category added successfully!".green());
            println!("UUID:  {}", created.id);
            println!("Order: {}", created.order);
        }
        CategoryCommand::Edit {
            id,
            name,
            r#type,
            description,
            order,
            parent,
            no_parent,
        } => {
            let category = resolve_category(catalog, id)?;
            let parent_category = if *no_parent {
                Some(None)
            } else {
                match parent {
                    Some(key) => Some(Some(resolve_category(catalog, key)?.id)),
                    None => None,
                }
            };
            let update = CategoryUpdate {
                name: name.clone(),
                category_type: r#type.clone(),
                description: description.clone(),
                order: *order,
                parent_category,
            };

            let updated = catalog.update_category(&category.id, update)?;
            println!("{} Category '{}' updated.", "✓".green(), updated.name);
        }
        CategoryCommand::Del { id, yes } => {
            let category = resolve_category(catalog, id)?;

            println!("{}", "Category to delete:".yellow());
            println!("  ID:   {}", category.id);
            println!("  Name: {}", category.name);
            println!("  Type: {}", category.category_type);

            if !*yes && !confirm("Are you sure you want to delete this category?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }

            catalog.delete_category(&category.id)?;
            println!("{}", "Category deleted successfully!".green());
        }
        CategoryCommand::Move { id, position } => {
            let category = resolve_category(catalog, id)?;
            let siblings = match &category.parent_category {
                Some(parent) => catalog.subcategories(&parent.id)?,
                None => catalog.main_categories()?,
            };
            let mut ids: Vec<Uuid> = siblings.iter().map(|c| c.id).collect();
            let from = ids
                .iter()
                .position(|c| *c == category.id)
                .context("Category not found among its siblings")?;
            let to = (*position).min(ids.len().saturating_sub(1));

            move_item(&mut ids, from, to);
            catalog.reorder_categories(&contiguous_orders(&ids))?;
            println!(
                "{} Moved '{}' to position {}.",
                "✓".green(),
                category.name,
                to
            );
        }
    }

    Ok(())
}

fn list_categories(catalog: &Catalog, category_type: Option<&str>) -> Result<()> {
    let categories = match category_type {
        Some(t) => catalog.categories_by_type(t)?,
        None => catalog.categories()?,
    };

    if categories.is_empty() {
        println!("{}", "No categories found.".yellow());
        return Ok(());
    }

    println!(
        "{:<36} | {:<28} | {:<20} | {:>5} | {:<20}",
        "UUID", "Name", "Type", "Order", "Parent"
    );
    println!("{}", "-".repeat(120));

    for category in categories {
        let name = if category.is_default {
            category.name.blue()
        } else {
            category.name.normal()
        };
        let parent = category
            .parent_category
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        println!(
            "{:<36} | {:<28} | {:<20} | {:>5} | {:<20}",
            category.id, name, category.category_type, category.order, parent
        );
    }

    Ok(())
}

fn print_category_tree(catalog: &Catalog) -> Result<()> {
    let roots = catalog.main_categories()?;
    if roots.is_empty() {
        println!("{}", "No categories found.".yellow());
        return Ok(());
    }
    let total = catalog.categories()?.len();
    for root in roots {
        print_category_node(catalog, &root, 0, total)?;
    }
    Ok(())
}

fn print_category_node(
    catalog: &Catalog,
    category: &pentkit_core::Category,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    println!(
        "{}{} {}",
        "  ".repeat(depth),
        category.name.bold(),
        format!("({})", category.category_type).dimmed()
    );
    if depth >= max_depth {
        return Ok(());
    }
    for child in catalog.subcategories(&category.id)? {
        print_category_node(catalog, &child, depth + 1, max_depth)?;
    }
    Ok(())
}

// =========================================================================
// Commands
// =========================================================================

fn handle_cmd_command(cmd: &CmdCommand, catalog: &Catalog) -> Result<()> {
    match cmd {
        CmdCommand::List {
            category,
            phase,
            r#type,
        } => {
            if let Some(category_type) = r#type {
                list_commands_by_phase(catalog, category_type)?;
            } else {
                let phase = phase.as_deref().map(parse_phase).transpose()?;
                let commands: Vec<ResolvedCommand> = match category {
                    Some(key) => {
                        let category = resolve_category(catalog, key)?;
                        catalog
                            .commands_by_category(&category.id)?
                            .into_iter()
                            .filter(|c| phase.map_or(true, |p| c.phase == p))
                            .collect()
                    }
                    None => match phase {
                        Some(p) => catalog.commands_by_phase(p)?,
                        None => catalog.commands()?,
                    },
                };
                list_commands(&commands);
            }
        }
        CmdCommand::Show { id } => {
            let command = resolve_command(catalog, id)?;
            println!("{}", command.name.bold());
            println!("  UUID:        {}", command.id);
            println!("  Command:     {}", command.command.green());
            println!("  Phase:       {}", command.phase);
            println!("  Order:       {}", command.order);
            println!(
                "  Category:    {}",
                command
                    .category
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("-")
            );
            if !command.tags.is_empty() {
                println!("  Tags:        {}", command.tags.join(", "));
            }
            if !command.description.is_empty() {
                println!("  Description: {}", command.description);
            }
        }
        CmdCommand::Add {
            name,
            command,
            description,
            category,
            phase,
            tags,
            order,
            interactive,
        } => {
            let request = if *interactive || (name.is_none() && command.is_none()) {
                prompts::prompt_new_command(&catalog.categories()?)?
            } else {
                let name = name
                    .clone()
                    .context("Name is required. Use --name to specify a name.")?;
                let template = command
                    .clone()
                    .context("Command is required. Use --command to specify a template.")?;
                let category = category
                    .as_deref()
                    .context("Category is required. Use --category to specify one.")?;
                NewCommand {
                    name,
                    command: template,
                    description: description.clone(),
                    category: resolve_category(catalog, category)?.id,
                    phase: match phase {
                        Some(p) => parse_phase(p)?,
                        None => Phase::Reconnaissance,
                    },
                    tags: tags.as_deref().map(split_tags).unwrap_or_default(),
                    order: *order,
                }
            };

            let created = catalog.create_command(request)?;
            println!("{}", "Command added successfully!".green());
            println!("UUID:  {}", created.id);
            println!("Order: {}", created.order);
        }
        CmdCommand::Edit {
            id,
            name,
            command,
            description,
            category,
            phase,
            tags,
            order,
            interactive,
        } => {
            let existing = resolve_command(catalog, id)?;
            let nothing_given = name.is_none()
                && command.is_none()
                && description.is_none()
                && category.is_none()
                && phase.is_none()
                && tags.is_none()
                && order.is_none();

            let update = if *interactive || nothing_given {
                prompts::prompt_edit_command(&existing, &catalog.categories()?)?
            } else {
                CommandUpdate {
                    name: name.clone(),
                    command: command.clone(),
                    description: description.clone(),
                    category: match category {
                        Some(key) => Some(resolve_category(catalog, key)?.id),
                        None => None,
                    },
                    phase: phase.as_deref().map(parse_phase).transpose()?,
                    tags: tags.as_deref().map(split_tags),
                    order: *order,
                }
            };

            let updated = catalog.update_command(&existing.id, update)?;
            println!("{} Command '{}' updated.", "✓".green(), updated.name);
        }
        CmdCommand::Del { id, yes } => {
            let command = resolve_command(catalog, id)?;

            println!("{}", "Command to delete:".yellow());
            println!("  ID:      {}", command.id);
            println!("  Name:    {}", command.name);
            println!("  Command: {}", command.command);

            if !*yes && !confirm("Are you sure you want to delete this command?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }

            catalog.delete_command(&command.id)?;
            println!("{}", "Command deleted successfully!".green());
        }
        CmdCommand::Move { id, position } => {
            let command = resolve_command(catalog, id)?;
            let category = command
                .category
                .as_ref()
                .context("Command has no category")?;
            let mut ids: Vec<Uuid> = catalog
                .commands_by_category(&category.id)?
                .into_iter()
                .filter(|c| c.phase == command.phase)
                .map(|c| c.id)
                .collect();
            let from = ids
                .iter()
                .position(|c| *c == command.id)
                .context("Command not found in its phase")?;
            let to = (*position).min(ids.len().saturating_sub(1));

            move_item(&mut ids, from, to);
            catalog.reorder_commands(&contiguous_orders(&ids))?;
            println!(
                "{} Moved '{}' to position {} in {} / {}.",
                "✓".green(),
                command.name,
                to,
                category.name,
                command.phase
            );
        }
    }

    Ok(())
}

fn list_commands(commands: &[ResolvedCommand]) {
    if commands.is_empty() {
        println!("{}", "No commands found.".yellow());
        return;
    }

    println!(
        "{:<36} | {:<30} | {:<17} | {:>5} | {:<20}",
        "UUID", "Name", "Phase", "Order", "Category"
    );
    println!("{}", "-".repeat(120));

    for command in commands {
        let category = command
            .category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!(
            "{:<36} | {:<30} | {:<17} | {:>5} | {:<20}",
            command.id,
            command.name,
            command.phase.to_string(),
            command.order,
            category
        );
    }
}

fn list_commands_by_phase(catalog: &Catalog, category_type: &str) -> Result<()> {
    let commands = catalog.commands()?;
    let groups = group_by_phase(&commands, category_type);
    if groups.is_empty() {
        println!(
            "{}",
            format!("No commands found for type '{}'.", category_type).yellow()
        );
        return Ok(());
    }

    for (phase, bucket) in groups {
        println!("{}", phase.to_string().bold().underline());
        for command in bucket {
            println!("  {:<30} {}", command.name, command.command.dimmed());
        }
        println!();
    }
    Ok(())
}

// =========================================================================
// Generate / search
// =========================================================================

fn generate_commands(
    catalog: &Catalog,
    inputs: GeneratorInputs,
    category: &Option<String>,
    phase: &Option<String>,
    view_type: &Option<String>,
) -> Result<()> {
    let generated = match view_type {
        Some(active_type) => {
            let commands = catalog.commands()?;
            generator::generate_for_view(&commands, active_type, &inputs)?
        }
        None => {
            let request = GenerateRequest {
                inputs,
                category_id: match category {
                    Some(key) => Some(resolve_category(catalog, key)?.id),
                    None => None,
                },
                phase: phase.as_deref().map(parse_phase).transpose()?,
            };
            catalog.generate(&request)?
        }
    };

    if generated.is_empty() {
        println!("{}", "No commands found.".yellow());
        return Ok(());
    }

    for item in generated {
        println!(
            "{} {}",
            item.command.name.bold(),
            format!("({})", item.command.phase).dimmed()
        );
        println!("  {}", item.generated_command.green());
    }
    Ok(())
}

fn search_commands(catalog: &Catalog, query: &str, show_scores: bool) -> Result<()> {
    let hits = catalog.search(query)?;
    if hits.is_empty() {
        println!("{}", format!("No commands match '{}'.", query).yellow());
        return Ok(());
    }

    for hit in hits {
        let category = hit
            .command
            .category
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        if show_scores {
            print!("{:>6.1}  ", hit.score);
        }
        println!(
            "{} {}",
            hit.command.name.bold(),
            format!("[{} / {}]", category, hit.command.phase).dimmed()
        );
        println!("  {}", hit.command.command);
    }
    Ok(())
}

// =========================================================================
// Storage
// =========================================================================

fn handle_db_command(cmd: &DbCommand, catalog: &Catalog) -> Result<()> {
    let backend = catalog.backend();
    match cmd {
        DbCommand::Path => {
            println!("{}", backend.path().display());
        }
        DbCommand::Stats => {
            let stats = backend.stats()?;
            println!("Backend:    {}", stats.backend_type);
            println!("Categories: {}", stats.category_count);
            println!("Commands:   {}", stats.command_count);
        }
        DbCommand::Migrate { to } => {
            if same_file(backend.path(), to) {
                anyhow::bail!("Target is the current catalog file");
            }
            let target = db::open_or_create(to, None)?;
            let stats = copy_catalog(backend, target.as_ref())?;
            println!(
                "{} Copied {} categories and {} commands to {} ({}).",
                "✓".green(),
                stats.category_count,
                stats.command_count,
                to.display(),
                stats.backend_type
            );
        }
        DbCommand::Export { output } => {
            let stats = export_backend_to_json(backend, output)?;
            println!(
                "{} Exported {} categories and {} commands to {}.",
                "✓".green(),
                stats.category_count,
                stats.command_count,
                output.display()
            );
        }
        DbCommand::Import { input, yes } => {
            if !*yes && !confirm("This replaces the whole catalog. Continue?")? {
                println!("Import cancelled.");
                return Ok(());
            }
            let stats = import_json_to_backend(backend, input)?;
            println!(
                "{} Imported {} categories and {} commands.",
                "✓".green(),
                stats.category_count,
                stats.command_count
            );
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
