use mimir_types::ProjectSlug;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Result,
    records::{ProjectRecord, ProjectUpsert},
};

pub fn upsert(conn: &Connection, project: &ProjectUpsert) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO projects (id, name, path, branch_name, description, last_synced)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            path = excluded.path,
            branch_name = excluded.branch_name,
            description = excluded.description,
            last_synced = excluded.last_synced
        "#,
        params![
            project.slug.as_str(),
            &project.name,
            &project.path,
            &project.branch_name,
            &project.description,
            &project.last_synced
        ],
    )?;

    Ok(())
}

pub fn set_story_counts(conn: &Connection, slug: &str, total: i64, done: i64) -> Result<()> {
    conn.execute(
        "UPDATE projects SET total_stories = ?1, done_stories = ?2 WHERE id = ?3",
        params![total, done, slug],
    )?;
    Ok(())
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        slug: ProjectSlug::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        path: row.get(2)?,
        branch_name: row.get(3)?,
        description: row.get(4)?,
        total_stories: row.get(5)?,
        done_stories: row.get(6)?,
        last_synced: row.get(7)?,
    })
}

pub fn get(conn: &Connection, slug: &str) -> Result<Option<ProjectRecord>> {
    let result = conn
        .query_row(
            r#"
        SELECT id, name, path, branch_name, description, total_stories, done_stories, last_synced
        FROM projects
        WHERE id = ?1
        "#,
            [slug],
            from_row,
        )
        .optional()?;

    Ok(result)
}

pub fn list(conn: &Connection) -> Result<Vec<ProjectRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, name, path, branch_name, description, total_stories, done_stories, last_synced
        FROM projects
        ORDER BY name
        "#,
    )?;

    let projects = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(projects)
}
