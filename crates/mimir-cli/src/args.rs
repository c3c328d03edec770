use crate::types::{LogLevel, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mimir")]
#[command(about = "Mirror project boards into a queryable store and stream their changes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: nearest mimir.toml at or above the working directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store location (overrides the configuration file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Directory to scan and watch; repeat for several (overrides the configuration file)
    #[arg(long = "watch", global = true)]
    pub watch: Vec<PathBuf>,

    #[arg(long, global = true)]
    pub max_depth: Option<usize>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Log verbosity when RUST_LOG is not set
    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest every project, then watch for changes until interrupted
    Run {
        /// Print each change notification as a Server-Sent Events frame on stdout
        #[arg(long)]
        sse: bool,
    },

    /// Discover and ingest every project once
    Scan,

    /// List ingested projects
    Projects,

    /// Show tasks of one project
    Tasks {
        /// Project slug
        project: String,
    },

    /// Show recent activity, newest first
    Activity {
        /// Project slug, or `all` for every project
        #[arg(default_value = "all")]
        project: String,

        #[arg(long, default_value = "20")]
        limit: usize,

        /// Only entries strictly after this timestamp (RFC 3339)
        #[arg(long)]
        after: Option<String>,
    },

    /// List agents assigned to in-progress tasks
    Agents,
}
