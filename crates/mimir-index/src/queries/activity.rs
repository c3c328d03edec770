use mimir_types::ProjectSlug;
use rusqlite::{Connection, Row, params};
use serde_json::Value;

use crate::{
    Result,
    records::{ActivityRecord, NewActivity},
};

/// Greatest stored timestamp for the project, or `None` when it has no activity.
pub fn latest_timestamp(conn: &Connection, slug: &str) -> Result<Option<String>> {
    let latest: Option<String> = conn.query_row(
        "SELECT MAX(timestamp) FROM activity WHERE project_id = ?1",
        [slug],
        |row| row.get(0),
    )?;
    Ok(latest)
}

pub fn insert(conn: &Connection, slug: &str, entry: &NewActivity) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO activity (project_id, event_type, story_id, agent_name, summary, metadata, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            slug,
            &entry.event_type,
            &entry.story_id,
            &entry.agent_name,
            &entry.summary,
            entry.metadata.to_string(),
            &entry.timestamp
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRecord> {
    let metadata: Option<String> = row.get(6)?;
    let metadata = metadata
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or(Value::Null);

    Ok(ActivityRecord {
        id: row.get(0)?,
        project: ProjectSlug::from(row.get::<_, String>(1)?),
        event_type: row.get(2)?,
        story_id: row.get(3)?,
        agent_name: row.get(4)?,
        summary: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        metadata,
        timestamp: row.get(7)?,
    })
}

/// Most recent activity first, optionally narrowed to one project and to
/// entries strictly after a normalized timestamp.
pub fn list(
    conn: &Connection,
    slug: Option<&str>,
    after: Option<&str>,
    limit: usize,
) -> Result<Vec<ActivityRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, project_id, event_type, story_id, agent_name, summary, metadata, timestamp
        FROM activity
        WHERE (?1 IS NULL OR project_id = ?1)
          AND (?2 IS NULL OR timestamp > ?2)
        ORDER BY timestamp DESC, id DESC
        LIMIT ?3
        "#,
    )?;

    let entries = stmt
        .query_map(params![slug, after, limit as i64], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(entries)
}

pub fn count_for_project(conn: &Connection, slug: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM activity WHERE project_id = ?1",
        [slug],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}
