use crate::types::OutputFormat;
use anyhow::{Result, bail};
use mimir_index::Database;

pub fn handle(db: &Database, project: &str, format: OutputFormat) -> Result<()> {
    if db.get_project(project)?.is_none() {
        bail!("Unknown project: {}", project);
    }
    let tasks = db.list_tasks(project)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    for task in tasks {
        let agent = task.assigned_agent.as_deref().unwrap_or("-");
        println!(
            "[{}] {:<12} p{} {:<10} {}",
            task.status, task.id, task.priority, agent, task.title
        );
        if let Some(reason) = task.blocked_reason.as_deref().filter(|r| !r.is_empty()) {
            println!("      blocked: {}", reason);
        }
    }
    Ok(())
}
