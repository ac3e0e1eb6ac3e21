//! CLI command definitions and dispatch for the `pflow` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a verb-noun
//! pattern (e.g., `pflow list packages`, `pflow seed skills`).

pub mod package;
pub mod skill;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Manage the enrollment eligibility workflow.
#[derive(Parser)]
#[command(name = "pflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (overrides config).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,
    },

    /// Show workflow counts and storage info.
    Status,

    /// List resources.
    #[command(alias = "ls")]
    List {
        #[command(subcommand)]
        resource: ListResource,
    },

    /// Seed reference data.
    Seed {
        #[command(subcommand)]
        resource: SeedResource,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ListResource {
    /// List packages (including inactive).
    Packages,
    /// List the skill catalog.
    Skills,
}

#[derive(Subcommand)]
pub enum SeedResource {
    /// Load skill catalog entries from a JSON file.
    Skills {
        /// Path to a JSON array of {id, category, label} objects.
        file: std::path::PathBuf,
    },
}
