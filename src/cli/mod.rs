//! Command-line interface for td
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// td - a local to-do list
///
/// Tasks live in a JSON file in the data directory. Top-level tasks can be
/// split into subtasks by hand or with an AI model.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the task store (defaults to the platform data dir)
    #[arg(long, global = true, env = "TD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config.toml (defaults to the platform config dir)
    #[arg(long, global = true, env = "TD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task (or a subtask with --parent)
    Add {
        /// Task title; blank titles are ignored
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Category: work, study, life, health, other
        #[arg(short, long)]
        category: Option<String>,

        /// Priority: high, medium, low
        #[arg(short, long)]
        priority: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Parent task ID (must be a top-level task)
        #[arg(long)]
        parent: Option<String>,

        /// Emit notifications as JSONL to a file path or '-' for stdout
        #[arg(long)]
        events: Option<String>,
    },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Status filter: all, active, completed
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive search over title and description
        #[arg(short, long)]
        search: Option<String>,

        /// Sort order: date, priority
        #[arg(long)]
        sort: Option<String>,

        /// Show subtasks of this task (repeatable)
        #[arg(long = "expand", value_name = "ID")]
        expand: Vec<String>,

        /// Show subtasks of every task
        #[arg(long, conflicts_with = "expand")]
        expand_all: bool,
    },

    /// Toggle a task between active and completed
    Toggle {
        /// Task ID
        id: String,
    },

    /// Delete a task and its subtasks
    #[command(alias = "delete")]
    Rm {
        /// Task ID
        id: String,
    },

    /// Remove all completed tasks
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Split a top-level task into subtasks with the AI splitter
    Split {
        /// Task ID
        id: String,

        /// Splitter mode: mock, real (defaults to config ai.mode)
        #[arg(long)]
        mode: Option<String>,

        /// API key (defaults to the env var named by ai.credential_env)
        #[arg(long)]
        api_key: Option<String>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Add {
                title,
                description,
                category,
                priority,
                due,
                parent,
                events,
            } => task::run_add(task::AddOptions {
                title,
                description,
                category,
                priority,
                due,
                parent,
                events,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List {
                status,
                search,
                sort,
                expand,
                expand_all,
            } => task::run_list(task::ListOptions {
                status,
                search,
                sort,
                expand,
                expand_all,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Toggle { id } => task::run_toggle(task::ToggleOptions {
                id,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Rm { id } => task::run_rm(task::RmOptions {
                id,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Clear { yes } => task::run_clear(task::ClearOptions {
                yes,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Split { id, mode, api_key } => task::run_split(task::SplitOptions {
                id,
                mode,
                api_key,
                data_dir: self.data_dir,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
