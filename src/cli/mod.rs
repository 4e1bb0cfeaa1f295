//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Scan-result reconciliation into a shared issue store (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "sm", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ./scanmerge.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the issue database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Manage the rule registry
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// Reconcile a scan snapshot into the store
    Reconcile(ReconcileArgs),

    /// Show stored issues
    Show {
        /// Issue keys
        keys: Vec<String>,
    },

    /// Show an issue's change history
    History {
        /// Issue key
        key: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RulesCommands {
    /// Import rules from a JSONL file (one {"repository","rule"} per line)
    Import {
        /// Rules file
        path: PathBuf,
    },

    /// List registered rules
    List,
}

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Snapshot file (one candidate issue per line, JSONL)
    pub snapshot: PathBuf,

    /// Rows per commit cycle
    #[arg(long)]
    pub batch_size: Option<usize>,
}
