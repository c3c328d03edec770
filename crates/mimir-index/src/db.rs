use mimir_types::ProjectSlug;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::time::Duration;

use crate::Result;
use crate::queries::{activity, project, task};
use crate::records::{
    ActiveAgent, ActivityRecord, NewActivity, ProjectRecord, ProjectUpsert, TaskRecord,
};
use crate::schema;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Start the single write transaction used by one ingest call.
    ///
    /// Nothing is visible to readers until [`SyncTransaction::commit`];
    /// dropping the handle rolls everything back.
    pub fn begin(&mut self) -> Result<SyncTransaction<'_>> {
        let tx = self.conn.transaction()?;
        Ok(SyncTransaction { tx })
    }

    // --- Projects ---

    pub fn get_project(&self, slug: &str) -> Result<Option<ProjectRecord>> {
        project::get(&self.conn, slug)
    }

    pub fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        project::list(&self.conn)
    }

    // --- Tasks ---

    pub fn list_tasks(&self, slug: &str) -> Result<Vec<TaskRecord>> {
        task::list_for_project(&self.conn, slug)
    }

    pub fn count_tasks(&self, slug: &str) -> Result<usize> {
        task::count_for_project(&self.conn, slug)
    }

    pub fn list_active_agents(&self) -> Result<Vec<ActiveAgent>> {
        task::active_agents(&self.conn)
    }

    // --- Activity ---

    pub fn list_activity(&self, slug: &str, limit: usize) -> Result<Vec<ActivityRecord>> {
        activity::list(&self.conn, Some(slug), None, limit)
    }

    /// Activity feed across projects (`slug = None`) or for one project,
    /// newest first. `after` is an exclusive cursor in stored encoding.
    pub fn activity_feed(
        &self,
        slug: Option<&str>,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>> {
        activity::list(&self.conn, slug, after, limit)
    }

    pub fn count_activity(&self, slug: &str) -> Result<usize> {
        activity::count_for_project(&self.conn, slug)
    }

    pub fn latest_activity_timestamp(&self, slug: &str) -> Result<Option<String>> {
        activity::latest_timestamp(&self.conn, slug)
    }
}

/// Write handle for one project's ingest.
pub struct SyncTransaction<'a> {
    tx: Transaction<'a>,
}

impl SyncTransaction<'_> {
    pub fn upsert_project(&self, project: &ProjectUpsert) -> Result<()> {
        project::upsert(&self.tx, project)
    }

    pub fn set_story_counts(&self, slug: &ProjectSlug, total: usize, done: usize) -> Result<()> {
        project::set_story_counts(&self.tx, slug.as_str(), total as i64, done as i64)
    }

    /// Replace the project's whole task set with `tasks`.
    ///
    /// Tasks sharing an id collapse to the last one given. Returns the number
    /// of rows the project holds afterwards.
    pub fn replace_tasks(&self, slug: &ProjectSlug, tasks: &[TaskRecord]) -> Result<usize> {
        let removed = task::delete_for_project(&self.tx, slug.as_str())?;
        tracing::trace!(project = %slug, removed, "Cleared task snapshot");

        let mut stored = 0;
        for record in tasks {
            if task::upsert(&self.tx, record)? {
                tracing::warn!(
                    project = %slug,
                    task_id = %record.id,
                    "Duplicate task id on board, keeping the later entry"
                );
            } else {
                stored += 1;
            }
        }

        Ok(stored)
    }

    pub fn latest_activity_timestamp(&self, slug: &ProjectSlug) -> Result<Option<String>> {
        activity::latest_timestamp(&self.tx, slug.as_str())
    }

    pub fn append_activity(&self, slug: &ProjectSlug, entry: &NewActivity) -> Result<i64> {
        activity::insert(&self.tx, slug.as_str(), entry)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimir_types::TaskStatus;
    use serde_json::json;

    fn demo_project(slug: &str, name: &str) -> ProjectUpsert {
        ProjectUpsert {
            slug: ProjectSlug::new(slug),
            name: name.to_string(),
            path: format!("/work/{}", slug),
            branch_name: Some("ralph/".to_string()),
            description: None,
            last_synced: "2025-01-01T00:00:00.000000000Z".to_string(),
        }
    }

    fn task(slug: &str, id: &str, status: TaskStatus, priority: i64) -> TaskRecord {
        TaskRecord {
            project: ProjectSlug::new(slug),
            id: id.to_string(),
            story_id: None,
            title: format!("task {}", id),
            description: None,
            status,
            domain: None,
            complexity: None,
            blocked_reason: None,
            assigned_agent: None,
            priority,
            updated_at: None,
        }
    }

    fn activity(ts: &str) -> NewActivity {
        NewActivity {
            event_type: "progress".to_string(),
            story_id: Some("US-1".to_string()),
            agent_name: Some("builder".to_string()),
            summary: format!("at {}", ts),
            metadata: json!({"files": 2}),
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn test_commit_makes_writes_visible() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        tx.set_story_counts(&slug, 3, 1)?;
        tx.commit()?;

        let project = db.get_project("demo")?.unwrap();
        assert_eq!(project.name, "Demo");
        assert_eq!(project.total_stories, 3);
        assert_eq!(project.done_stories, 1);
        assert_eq!(project.branch_name.as_deref(), Some("ralph/"));
        Ok(())
    }

    #[test]
    fn test_dropped_transaction_rolls_back() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        {
            let tx = db.begin()?;
            tx.upsert_project(&demo_project("demo", "Demo"))?;
            tx.replace_tasks(&slug, &[task("demo", "T-1", TaskStatus::Backlog, 2)])?;
        }

        assert!(db.get_project("demo")?.is_none());
        assert_eq!(db.count_tasks("demo")?, 0);
        Ok(())
    }

    #[test]
    fn test_upsert_keeps_story_counts() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        tx.set_story_counts(&slug, 5, 2)?;
        tx.commit()?;

        let mut renamed = demo_project("demo", "DEMO");
        renamed.path = "/elsewhere/demo".to_string();
        let tx = db.begin()?;
        tx.upsert_project(&renamed)?;
        tx.commit()?;

        let project = db.get_project("demo")?.unwrap();
        assert_eq!(project.name, "DEMO");
        assert_eq!(project.path, "/elsewhere/demo");
        assert_eq!(project.total_stories, 5);
        assert_eq!(db.list_projects()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_replace_tasks_is_total() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        tx.replace_tasks(
            &slug,
            &[
                task("demo", "T-1", TaskStatus::Backlog, 2),
                task("demo", "T-2", TaskStatus::Done, 1),
            ],
        )?;
        tx.commit()?;
        assert_eq!(db.count_tasks("demo")?, 2);

        let tx = db.begin()?;
        tx.replace_tasks(&slug, &[task("demo", "T-2", TaskStatus::Done, 1)])?;
        tx.commit()?;

        let tasks = db.list_tasks("demo")?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "T-2");
        assert_eq!(tasks[0].status, TaskStatus::Done);
        Ok(())
    }

    #[test]
    fn test_duplicate_task_ids_keep_last() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        let stored = tx.replace_tasks(
            &slug,
            &[
                task("demo", "T-1", TaskStatus::Backlog, 2),
                task("demo", "T-1", TaskStatus::Blocked, 0),
            ],
        )?;
        tx.commit()?;

        assert_eq!(stored, 1);
        let tasks = db.list_tasks("demo")?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Blocked);
        assert_eq!(tasks[0].priority, 0);
        Ok(())
    }

    #[test]
    fn test_activity_cursor_and_listing() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        assert_eq!(tx.latest_activity_timestamp(&slug)?, None);
        let first = tx.append_activity(&slug, &activity("2025-01-01T00:00:01.000000000Z"))?;
        let second = tx.append_activity(&slug, &activity("2025-01-01T00:00:02.000000000Z"))?;
        tx.commit()?;

        assert!(second > first);
        assert_eq!(
            db.latest_activity_timestamp("demo")?.as_deref(),
            Some("2025-01-01T00:00:02.000000000Z")
        );

        let recent = db.list_activity("demo", 10)?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, "2025-01-01T00:00:02.000000000Z");
        assert_eq!(recent[0].metadata, json!({"files": 2}));
        assert_eq!(recent[0].agent_name.as_deref(), Some("builder"));
        assert_eq!(db.list_activity("demo", 1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_activity_feed_across_projects_with_cursor() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let demo = ProjectSlug::new("demo");
        let other = ProjectSlug::new("other");

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        tx.upsert_project(&demo_project("other", "Other"))?;
        tx.append_activity(&demo, &activity("2025-01-01T00:00:01.000000000Z"))?;
        tx.append_activity(&other, &activity("2025-01-01T00:00:02.000000000Z"))?;
        tx.append_activity(&demo, &activity("2025-01-01T00:00:03.000000000Z"))?;
        tx.commit()?;

        let all = db.activity_feed(None, None, 10)?;
        let order: Vec<_> = all.iter().map(|a| a.project.as_str()).collect();
        assert_eq!(order, vec!["demo", "other", "demo"]);

        let newer = db.activity_feed(None, Some("2025-01-01T00:00:01.000000000Z"), 10)?;
        assert_eq!(newer.len(), 2);

        let demo_newer = db.activity_feed(Some("demo"), Some("2025-01-01T00:00:01.000000000Z"), 10)?;
        assert_eq!(demo_newer.len(), 1);
        assert_eq!(demo_newer[0].timestamp, "2025-01-01T00:00:03.000000000Z");

        assert_eq!(db.activity_feed(None, None, 1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_active_agents_from_in_progress_tasks() -> Result<()> {
        let mut db = Database::open_in_memory()?;
        let slug = ProjectSlug::new("demo");

        let mut working = task("demo", "T-1", TaskStatus::InProgress, 1);
        working.assigned_agent = Some("builder-1".to_string());
        let mut idle = task("demo", "T-2", TaskStatus::Backlog, 1);
        idle.assigned_agent = Some("builder-2".to_string());
        let mut blank = task("demo", "T-3", TaskStatus::InProgress, 1);
        blank.assigned_agent = Some(String::new());

        let tx = db.begin()?;
        tx.upsert_project(&demo_project("demo", "Demo"))?;
        tx.replace_tasks(&slug, &[working, idle, blank])?;
        tx.commit()?;

        let agents = db.list_active_agents()?;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "builder-1");
        assert_eq!(agents[0].project_name, "Demo");
        assert_eq!(agents[0].current_task, "task T-1");
        Ok(())
    }
}
