use mimir_types::{ProjectSlug, TaskStatus};
use serde::Serialize;
use serde_json::Value;

/// Project row as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    /// Slug of the declared name; primary key.
    pub slug: ProjectSlug,
    /// Declared display name.
    pub name: String,
    /// Absolute path to the project root it was last ingested from.
    pub path: String,
    pub branch_name: Option<String>,
    pub description: Option<String>,
    pub total_stories: i64,
    pub done_stories: i64,
    /// When the project was last ingested (UTC, nanosecond precision).
    pub last_synced: Option<String>,
}

/// Identity and declaration fields written on every ingest.
///
/// Story counts are written separately so that a project without a
/// requirements file keeps whatever counts it had.
#[derive(Debug, Clone)]
pub struct ProjectUpsert {
    pub slug: ProjectSlug,
    pub name: String,
    pub path: String,
    pub branch_name: Option<String>,
    pub description: Option<String>,
    pub last_synced: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub project: ProjectSlug,
    pub id: String,
    pub story_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub domain: Option<String>,
    pub complexity: Option<String>,
    pub blocked_reason: Option<String>,
    pub assigned_agent: Option<String>,
    pub priority: i64,
    pub updated_at: Option<String>,
}

/// Activity row as stored. `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub project: ProjectSlug,
    pub event_type: String,
    pub story_id: Option<String>,
    pub agent_name: Option<String>,
    pub summary: String,
    pub metadata: Value,
    /// Producer timestamp, normalized to fixed-width UTC.
    pub timestamp: String,
}

/// Activity entry ready to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub event_type: String,
    pub story_id: Option<String>,
    pub agent_name: Option<String>,
    pub summary: String,
    pub metadata: Value,
    pub timestamp: String,
}

/// An agent currently assigned to an in-progress task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAgent {
    pub name: String,
    pub project: ProjectSlug,
    pub project_name: String,
    pub story_id: Option<String>,
    pub current_task: String,
    pub since: Option<String>,
}
