// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siteswap")]
#[command(about = "Update a hosted site from an artifact, rolling back from a snapshot on failure")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the configuration file (default: discover in current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new siteswap.yml configuration file
    Init {
        /// Site name
        #[arg(long)]
        site: Option<String>,

        /// Absolute path of the site's content root
        #[arg(long)]
        root: Option<PathBuf>,

        /// Artifact URL or path
        #[arg(long)]
        artifact: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Update a site from its artifact
    Update {
        /// Site to update (defined in config)
        site: String,

        /// Artifact URL or path, overriding the configured one
        #[arg(short, long)]
        artifact: Option<String>,

        /// Break an existing run lock
        #[arg(long)]
        force: bool,
    },

    /// Show configured sites and retained snapshots
    Status {
        /// Only show this site
        site: Option<String>,
    },

    /// Restore a site from its retained snapshot
    Rollback {
        /// Site to restore
        site: String,
    },

    /// Delete a site's retained snapshot
    Discard {
        /// Site whose snapshot to delete
        site: String,
    },
}
