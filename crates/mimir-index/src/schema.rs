use rusqlite::Connection;

use crate::Result;

// Schema version (increment when changing table definitions or the stored
// timestamp encoding)
pub const SCHEMA_VERSION: i32 = 2;

// NOTE: The store is a mirror, not a source of truth.
// Project files on disk own the data; a version bump drops and rebuilds the
// tables and the next ingest pass repopulates them. Activity is the only
// table that cannot be rebuilt from a single file read without the cursor,
// and it is rebuilt from the full progress log when its table is empty.

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != SCHEMA_VERSION {
        if current_version != 0 {
            tracing::info!(
                from = current_version,
                to = SCHEMA_VERSION,
                "Schema version changed, rebuilding store"
            );
        }
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL,
            branch_name TEXT,
            description TEXT,
            total_stories INTEGER NOT NULL DEFAULT 0,
            done_stories INTEGER NOT NULL DEFAULT 0,
            last_synced TEXT
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT NOT NULL,
            project_id TEXT NOT NULL REFERENCES projects(id),
            story_id TEXT,
            title TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'backlog',
            domain TEXT,
            complexity TEXT,
            blocked_reason TEXT,
            assigned_agent TEXT,
            priority INTEGER NOT NULL DEFAULT 2,
            updated_at TEXT,
            PRIMARY KEY (project_id, id)
        );

        CREATE TABLE IF NOT EXISTS activity (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES projects(id),
            event_type TEXT NOT NULL,
            story_id TEXT,
            agent_name TEXT,
            summary TEXT,
            metadata TEXT,
            timestamp TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
        CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
        CREATE INDEX IF NOT EXISTS idx_activity_project ON activity(project_id);
        CREATE INDEX IF NOT EXISTS idx_activity_timestamp ON activity(timestamp DESC);
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS activity;
        DROP TABLE IF EXISTS tasks;
        DROP TABLE IF EXISTS projects;
        "#,
    )?;
    Ok(())
}
