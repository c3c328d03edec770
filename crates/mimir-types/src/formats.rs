//! Serde shapes of the files a producer writes into a project root.
//!
//! Every field is optional on disk; absent values fall back to the same
//! defaults the producing tooling assumes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::TaskStatus;

/// Contents of the project marker (`ullr.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Declared display name. Falls back to the directory name when absent.
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub branch_prefix: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Contents of `taskboard.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskBoard {
    #[serde(default)]
    pub backlog: Vec<TaskEntry>,
    #[serde(default)]
    pub in_progress: Vec<TaskEntry>,
    #[serde(default)]
    pub done: Vec<TaskEntry>,
    #[serde(default)]
    pub blocked: Vec<TaskEntry>,
}

impl TaskBoard {
    pub fn column(&self, status: TaskStatus) -> &[TaskEntry] {
        match status {
            TaskStatus::Backlog => &self.backlog,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Done => &self.done,
            TaskStatus::Blocked => &self.blocked,
        }
    }

    /// Every task paired with the column it was found in, in column order.
    pub fn entries(&self) -> impl Iterator<Item = (TaskStatus, &TaskEntry)> {
        TaskStatus::COLUMNS
            .into_iter()
            .flat_map(move |status| self.column(status).iter().map(move |task| (status, task)))
    }
}

fn default_priority() -> i64 {
    2
}

/// Producers write `null` for unset fields; treat it like an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn priority_or_default<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_else(default_priority))
}

fn event_type_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_event_type))
}

fn metadata_or_default<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.unwrap_or_else(default_metadata))
}

/// Identifier fields arrive as strings or bare numbers (`"US-7"` or `7`).
fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn loose_string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    #[serde(default, deserialize_with = "loose_string_or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub story_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub assigned_agent: Option<String>,
    /// Lower is more urgent.
    #[serde(default = "default_priority", deserialize_with = "priority_or_default")]
    pub priority: i64,
}

/// Contents of `prd.json`. Only the story list matters here; stories are
/// kept as raw values because their shape is owned by the producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirements {
    #[serde(default, rename = "userStories")]
    pub user_stories: Vec<Value>,
}

impl Requirements {
    pub fn total_stories(&self) -> usize {
        self.user_stories.len()
    }

    /// Stories whose `passes` flag is exactly `true`. Strings such as
    /// `"true"` do not count.
    pub fn done_stories(&self) -> usize {
        self.user_stories
            .iter()
            .filter(|story| story.get("passes") == Some(&Value::Bool(true)))
            .count()
    }
}

fn default_event_type() -> String {
    "progress".to_string()
}

fn default_metadata() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One line of `progress.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    /// Producer-assigned; validated and normalized before storage.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default = "default_event_type", deserialize_with = "event_type_or_default")]
    pub event_type: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub story_id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default = "default_metadata", deserialize_with = "metadata_or_default")]
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_defaults() {
        let task: TaskEntry = serde_json::from_value(json!({"id": "T-1"})).unwrap();
        assert_eq!(task.priority, 2);
        assert_eq!(task.title, "");
        assert!(task.story_id.is_none());
    }

    #[test]
    fn test_board_entries_follow_column_order() {
        let board: TaskBoard = serde_json::from_value(json!({
            "blocked": [{"id": "b"}],
            "backlog": [{"id": "a1"}, {"id": "a2"}],
            "done": [{"id": "d"}]
        }))
        .unwrap();

        let flattened: Vec<_> = board
            .entries()
            .map(|(status, task)| (status, task.id.as_str()))
            .collect();
        assert_eq!(
            flattened,
            vec![
                (TaskStatus::Backlog, "a1"),
                (TaskStatus::Backlog, "a2"),
                (TaskStatus::Done, "d"),
                (TaskStatus::Blocked, "b"),
            ]
        );
    }

    #[test]
    fn test_null_priority_falls_back_to_default() {
        let task: TaskEntry =
            serde_json::from_value(json!({"id": "T-1", "title": null, "priority": null})).unwrap();
        assert_eq!(task.priority, 2);
        assert_eq!(task.title, "");
    }

    #[test]
    fn test_numeric_ids_are_read_as_text() {
        let task: TaskEntry =
            serde_json::from_value(json!({"id": 12, "story_id": 7, "priority": 1})).unwrap();
        assert_eq!(task.id, "12");
        assert_eq!(task.story_id.as_deref(), Some("7"));
        assert_eq!(task.priority, 1);
    }

    #[test]
    fn test_story_counts_require_literal_true() {
        let prd: Requirements = serde_json::from_value(json!({
            "userStories": [
                {"id": "US-1", "passes": true},
                {"id": "US-2", "passes": "true"},
                {"id": "US-3"},
                {"id": "US-4", "passes": false}
            ]
        }))
        .unwrap();
        assert_eq!(prd.total_stories(), 4);
        assert_eq!(prd.done_stories(), 1);
    }

    #[test]
    fn test_progress_defaults() {
        let entry: ProgressEntry =
            serde_json::from_str(r#"{"timestamp": "2025-01-01T00:00:00Z", "summary": "x"}"#)
                .unwrap();
        assert_eq!(entry.event_type, "progress");
        assert_eq!(entry.metadata, json!({}));
        assert!(entry.agent.is_none());
    }

    #[test]
    fn test_progress_nulls_read_as_absent() {
        let entry: ProgressEntry = serde_json::from_str(
            r#"{"timestamp": "2025-01-01T10:00:00Z", "event_type": null, "summary": null, "metadata": null, "agent": null}"#,
        )
        .unwrap();
        assert_eq!(entry.event_type, "progress");
        assert_eq!(entry.summary, "");
        assert_eq!(entry.metadata, json!({}));
        assert!(entry.agent.is_none());
    }

    #[test]
    fn test_progress_numeric_story_id() {
        let entry: ProgressEntry =
            serde_json::from_str(r#"{"timestamp": "2025-01-01T10:00:00Z", "story_id": 7}"#).unwrap();
        assert_eq!(entry.story_id.as_deref(), Some("7"));
    }
}
