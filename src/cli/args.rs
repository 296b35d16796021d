//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::AssignedToOperation;

/// Technology operation trees: copy reference technologies, guard against cycles
#[derive(Parser, Debug)]
#[command(name = "techtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Catalog file (overrides config)
    #[arg(long, global = true, env = "TECHTREE_STORE", value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,

    /// Config file (default: XDG config dir)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a technology
    Init {
        /// Technology number
        number: String,
        /// Product produced by the technology
        #[arg(long)]
        product: Option<u64>,
    },

    /// Register an operation in the dictionary
    Operation {
        #[command(subcommand)]
        command: OperationCommands,
    },

    /// Show operation trees
    Tree {
        /// Technology number (default: all technologies)
        number: Option<String>,
    },

    /// Add an operation component
    Add {
        /// Owning technology number
        #[arg(short, long)]
        technology: String,
        /// Parent component id (default: below the root)
        #[arg(short, long)]
        parent: Option<u64>,
        /// Operation id
        #[arg(short, long)]
        operation: Option<u64>,
        /// Technology number whose tree is copied below the new component
        #[arg(short, long)]
        reference: Option<String>,
    },

    /// Update an operation component
    Update {
        /// Owning technology number
        #[arg(short, long)]
        technology: String,
        /// Component id
        id: u64,
        /// New operation id
        #[arg(short, long)]
        operation: Option<u64>,
        /// Technological process list id
        #[arg(long)]
        process_list: Option<u64>,
        /// Remove the technological process list
        #[arg(long, conflicts_with = "process_list")]
        clear_process_list: bool,
        /// Workstation assignment
        #[arg(long, value_enum)]
        assigned: Option<Assignment>,
    },

    /// Delete an operation component and its subtree
    Delete {
        /// Owning technology number
        #[arg(short, long)]
        technology: String,
        /// Component id
        id: u64,
    },

    /// Record that a product structure tree uses a component
    Use {
        /// Component id
        id: u64,
        /// Main technology number of the product structure tree
        #[arg(short, long)]
        technology: String,
    },

    /// Check whether a reference technology may be copied
    CheckCycle {
        /// Owning technology number
        #[arg(short, long)]
        technology: String,
        /// Reference technology number
        #[arg(short, long)]
        reference: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Add an operation
    Add {
        /// Operation number
        number: String,
        /// Operation name
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        product: Option<u64>,
        #[arg(long)]
        quantity_of_workstations: Option<i64>,
        #[arg(long, value_enum)]
        assigned: Option<Assignment>,
        #[arg(long)]
        workstation_type: Option<u64>,
        /// Workstation ids
        #[arg(long, value_delimiter = ',')]
        workstations: Vec<u64>,
    },
    /// List operations
    List,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,
    /// Print a template config file
    Template,
    /// Show config paths
    Path,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    Workstations,
    WorkstationTypes,
}

impl From<Assignment> for AssignedToOperation {
    fn from(a: Assignment) -> Self {
        match a {
            Assignment::Workstations => AssignedToOperation::Workstations,
            Assignment::WorkstationTypes => AssignedToOperation::WorkstationTypes,
        }
    }
}
