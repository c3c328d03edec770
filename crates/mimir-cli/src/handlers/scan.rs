use crate::types::OutputFormat;
use anyhow::Result;
use mimir_index::Store;
use mimir_runtime::{Config, ingest_all};
use serde_json::json;

pub fn handle(config: &Config, format: OutputFormat) -> Result<()> {
    let store = Store::connect(&config.resolved_db_path()?)?;
    let discovered = ingest_all(&store, &config.watch_paths, config.max_depth)?;
    let stored = store.with_db(|db| db.list_projects())?.len();
    store.close();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                json!({ "discovered": discovered, "projects": stored })
            );
        }
        OutputFormat::Plain => {
            println!("Discovered {} project(s), {} in store", discovered, stored);
        }
    }
    Ok(())
}
