use crate::types::OutputFormat;
use anyhow::Result;
use mimir_index::Database;

pub fn handle(db: &Database, format: OutputFormat) -> Result<()> {
    let agents = db.list_active_agents()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    if agents.is_empty() {
        println!("No agents working on in-progress tasks.");
        return Ok(());
    }

    for agent in agents {
        println!(
            "{:<16} {:<20} {}",
            agent.name,
            agent.project.as_str(),
            agent.current_task
        );
    }
    Ok(())
}
