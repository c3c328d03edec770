use super::args::{Cli, Commands};
use super::handlers;
use super::logging;
use anyhow::{Context, Result, bail};
use mimir_index::Database;
use mimir_runtime::Config;

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.log_level);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { sse } => {
            require_watch_paths(&config)?;
            handlers::run::handle(&config, sse)
        }

        Commands::Scan => {
            require_watch_paths(&config)?;
            handlers::scan::handle(&config, cli.format)
        }

        Commands::Projects => {
            let db = open_database(&config)?;
            handlers::projects::handle(&db, cli.format)
        }

        Commands::Tasks { project } => {
            let db = open_database(&config)?;
            handlers::tasks::handle(&db, &project, cli.format)
        }

        Commands::Activity {
            project,
            limit,
            after,
        } => {
            let db = open_database(&config)?;
            handlers::activity::handle(&db, &project, after.as_deref(), limit, cli.format)
        }

        Commands::Agents => {
            let db = open_database(&config)?;
            handlers::agents::handle(&db, cli.format)
        }
    }
}

/// Configuration file first, then command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                bail!("Configuration file not found: {}", path.display());
            }
            Config::load_from(path)?
        }
        None => Config::discover()?,
    };

    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    if !cli.watch.is_empty() {
        config.watch_paths = cli.watch.clone();
    }
    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
    }

    Ok(config)
}

fn require_watch_paths(config: &Config) -> Result<()> {
    if config.watch_paths.is_empty() {
        bail!("No watch paths configured; pass --watch <DIR> or set watch_paths in mimir.toml");
    }
    Ok(())
}

fn open_database(config: &Config) -> Result<Database> {
    let db_path = config.resolved_db_path()?;
    Database::open(&db_path).with_context(|| format!("Failed to open store: {}", db_path.display()))
}
