//! Sample file contents in the shapes producers write.

use serde_json::{Value, json};

/// A requirements document with `total` stories, the first `done` passing.
pub fn requirements(total: usize, done: usize) -> Value {
    let stories: Vec<Value> = (0..total)
        .map(|i| {
            json!({
                "id": format!("US-{:03}", i + 1),
                "title": format!("Story {}", i + 1),
                "passes": i < done,
            })
        })
        .collect();
    json!({ "project": "fixture", "userStories": stories })
}

/// A task board entry.
pub fn task(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "story_id": "US-001",
        "domain": "backend",
        "complexity": "small",
        "priority": 1,
    })
}

/// One serialized progress log line.
pub fn progress_line(timestamp: &str, summary: &str) -> String {
    json!({
        "timestamp": timestamp,
        "event_type": "progress",
        "story_id": "US-001",
        "agent": "builder",
        "summary": summary,
        "metadata": { "source": "fixture" },
    })
    .to_string()
}
