use mimir_types::{ProjectSlug, TaskStatus};
use rusqlite::{Connection, Row, params, types::Type};

use crate::{
    Result,
    records::{ActiveAgent, TaskRecord},
};

pub fn delete_for_project(conn: &Connection, slug: &str) -> Result<usize> {
    let removed = conn.execute("DELETE FROM tasks WHERE project_id = ?1", [slug])?;
    Ok(removed)
}

/// Returns `true` when the row replaced an earlier task with the same id.
pub fn upsert(conn: &Connection, task: &TaskRecord) -> Result<bool> {
    let existed: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE project_id = ?1 AND id = ?2)",
        params![task.project.as_str(), &task.id],
        |row| row.get(0),
    )?;

    conn.execute(
        r#"
        INSERT INTO tasks (id, project_id, story_id, title, description, status,
                           domain, complexity, blocked_reason, assigned_agent, priority, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(project_id, id) DO UPDATE SET
            story_id = excluded.story_id,
            title = excluded.title,
            description = excluded.description,
            status = excluded.status,
            domain = excluded.domain,
            complexity = excluded.complexity,
            blocked_reason = excluded.blocked_reason,
            assigned_agent = excluded.assigned_agent,
            priority = excluded.priority,
            updated_at = excluded.updated_at
        "#,
        params![
            &task.id,
            task.project.as_str(),
            &task.story_id,
            &task.title,
            &task.description,
            task.status.as_str(),
            &task.domain,
            &task.complexity,
            &task.blocked_reason,
            &task.assigned_agent,
            task.priority,
            &task.updated_at
        ],
    )?;

    Ok(existed)
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    let status: String = row.get(5)?;
    let status = TaskStatus::parse(&status)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(5, "status".to_string(), Type::Text))?;

    Ok(TaskRecord {
        project: ProjectSlug::from(row.get::<_, String>(1)?),
        id: row.get(0)?,
        story_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status,
        domain: row.get(6)?,
        complexity: row.get(7)?,
        blocked_reason: row.get(8)?,
        assigned_agent: row.get(9)?,
        priority: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Tasks of one project, most urgent first.
pub fn list_for_project(conn: &Connection, slug: &str) -> Result<Vec<TaskRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, project_id, story_id, title, description, status,
               domain, complexity, blocked_reason, assigned_agent, priority, updated_at
        FROM tasks
        WHERE project_id = ?1
        ORDER BY priority ASC, id ASC
        "#,
    )?;

    let tasks = stmt
        .query_map([slug], from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(tasks)
}

pub fn count_for_project(conn: &Connection, slug: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
        [slug],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Agents inferred from in-progress task assignments across all projects.
pub fn active_agents(conn: &Connection) -> Result<Vec<ActiveAgent>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT t.assigned_agent, t.project_id, p.name, t.story_id, t.title, t.updated_at
        FROM tasks t
        JOIN projects p ON t.project_id = p.id
        WHERE t.status = 'in_progress'
          AND t.assigned_agent IS NOT NULL
          AND t.assigned_agent != ''
        ORDER BY t.updated_at DESC, t.assigned_agent ASC
        "#,
    )?;

    let agents = stmt
        .query_map([], |row| {
            Ok(ActiveAgent {
                name: row.get(0)?,
                project: ProjectSlug::from(row.get::<_, String>(1)?),
                project_name: row.get(2)?,
                story_id: row.get(3)?,
                current_task: row.get(4)?,
                since: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(agents)
}
