use crate::types::OutputFormat;
use anyhow::Result;
use mimir_index::Database;

pub fn handle(db: &Database, format: OutputFormat) -> Result<()> {
    let projects = db.list_projects()?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects ingested yet. Run `mimir scan` first.");
        return Ok(());
    }

    for project in projects {
        println!(
            "{:<24} {:>3}/{:<3} {:<24} {}",
            project.slug.as_str(),
            project.done_stories,
            project.total_stories,
            project.name,
            project.path
        );
    }
    Ok(())
}
