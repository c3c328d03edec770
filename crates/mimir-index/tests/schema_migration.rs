//! Integration tests for schema versioning
//!
//! Opening a store whose `user_version` differs from the current schema
//! drops and recreates the tables instead of failing on missing columns.

use mimir_index::{Database, ProjectUpsert, SCHEMA_VERSION};
use mimir_types::ProjectSlug;
use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

/// A store written by an older build: no story counts, no branch hint.
fn create_old_schema_db(path: &Path) {
    let conn = Connection::open(path).unwrap();

    conn.execute_batch(
        r#"
        CREATE TABLE projects (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            path TEXT NOT NULL
        );

        CREATE TABLE activity (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL,
            summary TEXT,
            timestamp TEXT NOT NULL
        );

        PRAGMA user_version = 0;
        "#,
    )
    .unwrap();

    conn.execute(
        "INSERT INTO projects (id, name, path) VALUES ('legacy', 'Legacy', '/old/legacy')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO activity (project_id, summary, timestamp) VALUES ('legacy', 'x', '2024-01-01')",
        [],
    )
    .unwrap();
}

fn user_version(path: &Path) -> i32 {
    let conn = Connection::open(path).unwrap();
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_auto_migration_from_old_schema() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mimir.db");

    create_old_schema_db(&db_path);
    assert_eq!(user_version(&db_path), 0);

    let mut db = Database::open(&db_path).unwrap();
    assert_eq!(user_version(&db_path), SCHEMA_VERSION);

    // Old rows are gone; the new columns are usable.
    assert!(db.list_projects().unwrap().is_empty());
    assert_eq!(db.count_activity("legacy").unwrap(), 0);

    let tx = db.begin().unwrap();
    tx.upsert_project(&ProjectUpsert {
        slug: ProjectSlug::new("fresh"),
        name: "Fresh".to_string(),
        path: "/new/fresh".to_string(),
        branch_name: Some("feat/".to_string()),
        description: Some("rebuilt".to_string()),
        last_synced: "2025-01-01T00:00:00.000000000Z".to_string(),
    })
    .unwrap();
    tx.set_story_counts(&ProjectSlug::new("fresh"), 4, 4).unwrap();
    tx.commit().unwrap();

    let fresh = db.get_project("fresh").unwrap().unwrap();
    assert_eq!(fresh.done_stories, 4);
}

#[test]
fn test_reopen_current_schema_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("mimir.db");

    {
        let mut db = Database::open(&db_path).unwrap();
        let tx = db.begin().unwrap();
        tx.upsert_project(&ProjectUpsert {
            slug: ProjectSlug::new("kept"),
            name: "Kept".to_string(),
            path: "/work/kept".to_string(),
            branch_name: None,
            description: None,
            last_synced: "2025-01-01T00:00:00.000000000Z".to_string(),
        })
        .unwrap();
        tx.commit().unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.list_projects().unwrap().len(), 1);
    assert_eq!(user_version(&db_path), SCHEMA_VERSION);
}
