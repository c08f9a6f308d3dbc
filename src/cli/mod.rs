//! CLI argument definitions for Jalon.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jalon - roadmap import and reconciliation for project missions.
///
/// Paste a roadmap, preview the diff against your missions, apply it, and
/// keep a permanent import history.
#[derive(Parser, Debug)]
#[command(name = "jn")]
#[command(author, version, about = "Import roadmap text into project missions", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (", env!("JN_GIT_COMMIT"), ", built ", env!("JN_BUILD_TIMESTAMP"), ")"
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if jn was started in <path> instead of the current directory.
    /// Bypasses git root detection - uses the path literally.
    /// Can also be set via JN_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "JN_REPO")]
    pub repo_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Mission management commands
    Mission {
        #[command(subcommand)]
        command: MissionCommands,
    },

    /// Roadmap import commands
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },

    /// Import history commands
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,
    },

    /// List all projects
    List,
}

#[derive(Subcommand, Debug)]
pub enum MissionCommands {
    /// Create a mission in a project
    Create {
        /// Project ID or name
        project: String,

        /// Mission title
        title: String,

        /// Detailed description
        #[arg(short, long)]
        description: Option<String>,

        /// Duration estimate (e.g., 3h, 2j, 45min)
        #[arg(short, long)]
        estimate: Option<String>,
    },

    /// List the missions of a project
    List {
        /// Project ID or name
        project: String,
    },

    /// Show a mission by ID
    Show {
        /// Mission ID (e.g., jn-a1b2)
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ImportCommands {
    /// Parse roadmap text and show the diff without applying it
    Preview {
        /// Project ID or name
        project: String,

        /// File containing the roadmap text (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Parse roadmap text, apply the diff and record the import
    Apply {
        /// Project ID or name
        project: String,

        /// File containing the roadmap text (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Who is running the import
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List import history entries for a project, newest first
    List {
        /// Project ID or name
        project: String,
    },

    /// Show one import history entry in full
    Show {
        /// History entry ID (e.g., jh-a1b2)
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize jalon storage for this repository
    Init,
}
