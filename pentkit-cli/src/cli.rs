use clap::{Parser, Subcommand};
use pentkit_core::BackendType;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Penetration-testing command catalog")]
pub struct Cli {
    /// Catalog file (.yaml or .db); overrides the config file
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,

    /// Storage backend, inferred from the file extension when omitted
    #[clap(long, global = true)]
    pub backend: Option<BackendType>,

    /// Config file (defaults to ~/.pentkit.yaml)
    #[clap(long, global = true, env = "PENTKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage categories
    #[clap(subcommand)]
    Category(CategoryCommand),

    /// Manage commands
    #[clap(subcommand)]
    Cmd(CmdCommand),

    /// Fill placeholders in command templates
    Generate {
        /// Value for {domain}
        #[clap(long, short = 'd')]
        domain: Option<String>,

        /// Value for {ip/range}
        #[clap(long)]
        ip_range: Option<String>,

        /// Value for {ports}
        #[clap(long)]
        ports: Option<String>,

        /// Value for {filename}
        #[clap(long)]
        filename: Option<String>,

        /// Only commands in this category (name or UUID)
        #[clap(long, short = 'c')]
        category: Option<String>,

        /// Only commands in this phase
        #[clap(long)]
        phase: Option<String>,

        /// Category type being viewed; other types keep their template
        #[clap(long, short = 't')]
        r#type: Option<String>,
    },

    /// Fuzzy search commands by name, tag, description or template
    Search {
        /// Search text
        query: String,

        /// Show the score of each hit
        #[clap(long)]
        scores: bool,
    },

    /// Storage operations
    #[clap(subcommand)]
    Db(DbCommand),

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// List categories
    List {
        /// Only categories of this type
        #[clap(long, short = 't')]
        r#type: Option<String>,

        /// Show the category tree instead of a table
        #[clap(long)]
        tree: bool,
    },

    /// Show details for a category
    Show {
        /// Category name or UUID
        id: String,
    },

    /// Add a category
    Add {
        #[clap(long)]
        name: Option<String>,

        #[clap(long, short = 't')]
        r#type: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Parent category name or UUID
        #[clap(long)]
        parent: Option<String>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Edit a category; omitted fields keep their value
    Edit {
        /// Category name or UUID
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long, short = 't')]
        r#type: Option<String>,

        #[clap(long)]
        description: Option<String>,

        #[clap(long)]
        order: Option<i64>,

        /// New parent category name or UUID
        #[clap(long, conflicts_with = "no_parent")]
        parent: Option<String>,

        /// Make this a top-level category
        #[clap(long)]
        no_parent: bool,
    },

    /// Delete a category
    Del {
        /// Category name or UUID
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Move a category to a position among its siblings
    Move {
        /// Category name or UUID
        id: String,

        /// Zero-based target position
        position: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum CmdCommand {
    /// List commands
    List {
        /// Only commands in this category (name or UUID)
        #[clap(long, short = 'c')]
        category: Option<String>,

        /// Only commands in this phase
        #[clap(long)]
        phase: Option<String>,

        /// Group the commands of one category type by phase
        #[clap(long, short = 't', conflicts_with_all = ["category", "phase"])]
        r#type: Option<String>,
    },

    /// Show details for a command
    Show {
        /// Command name or UUID
        id: String,
    },

    /// Add a command
    Add {
        #[clap(long)]
        name: Option<String>,

        /// Template, e.g. "nmap -sC -sV {domain}"
        #[clap(long)]
        command: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Category name or UUID
        #[clap(long, short = 'c')]
        category: Option<String>,

        #[clap(long)]
        phase: Option<String>,

        /// Comma separated tags
        #[clap(long)]
        tags: Option<String>,

        /// Explicit position; defaults to the end of its category and phase
        #[clap(long)]
        order: Option<i64>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Edit a command; omitted fields keep their value
    Edit {
        /// Command name or UUID
        id: String,

        #[clap(long)]
        name: Option<String>,

        #[clap(long)]
        command: Option<String>,

        #[clap(long)]
        description: Option<String>,

        /// Category name or UUID
        #[clap(long, short = 'c')]
        category: Option<String>,

        #[clap(long)]
        phase: Option<String>,

        /// Comma separated tags
        #[clap(long)]
        tags: Option<String>,

        #[clap(long)]
        order: Option<i64>,

        /// Use interactive mode (prompts)
        #[clap(long)]
        interactive: bool,
    },

    /// Delete a command
    Del {
        /// Command name or UUID
        id: String,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Move a command to a position within its category and phase
    Move {
        /// Command name or UUID
        id: String,

        /// Zero-based target position
        position: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Print the path to the catalog file
    Path,

    /// Show record counts
    Stats,

    /// Copy the catalog into another file (backend taken from its extension)
    Migrate {
        /// Target file (.yaml or .db)
        to: PathBuf,
    },

    /// Export the catalog to JSON
    Export {
        /// Output JSON file
        output: PathBuf,
    },

    /// Replace the catalog with a JSON export
    Import {
        /// Input JSON file
        input: PathBuf,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}
