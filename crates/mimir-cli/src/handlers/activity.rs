use crate::types::OutputFormat;
use anyhow::{Result, bail};
use mimir_index::Database;
use mimir_types::normalize_source_timestamp;

const ALL_PROJECTS: &str = "all";

pub fn handle(
    db: &Database,
    project: &str,
    after: Option<&str>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let slug = if project == ALL_PROJECTS {
        None
    } else {
        if db.get_project(project)?.is_none() {
            bail!("Unknown project: {}", project);
        }
        Some(project)
    };

    // Stored timestamps share one encoding, so the cursor must too.
    let after = match after {
        Some(raw) => match normalize_source_timestamp(raw) {
            Some(normalized) => Some(normalized),
            None => bail!("Invalid --after timestamp: {}", raw),
        },
        None => None,
    };

    let entries = db.activity_feed(slug, after.as_deref(), limit)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} {:<12} {:<10} {:<10} {}",
            entry.timestamp,
            entry.project.as_str(),
            entry.event_type,
            entry.agent_name.as_deref().unwrap_or("-"),
            entry.summary
        );
    }
    Ok(())
}
