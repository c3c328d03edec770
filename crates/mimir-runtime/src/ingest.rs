use mimir_index::{NewActivity, ProjectUpsert, Store, TaskRecord};
use mimir_types::{
    ProgressEntry, ProjectFile, ProjectManifest, ProjectSlug, Requirements, TaskBoard,
    normalize_source_timestamp, now_timestamp,
};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::discovery::discover_projects;
use crate::{Error, Result};

/// What one successful [`ingest`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub slug: ProjectSlug,
    pub root: PathBuf,
    /// Tasks now stored, when a task board was present.
    pub tasks: Option<usize>,
    /// `(total, done)` story counts, when a requirements file was present.
    pub stories: Option<(usize, usize)>,
    /// Activity rows appended by this call.
    pub activity_added: usize,
}

/// Everything read from one project root before the store is touched.
#[derive(Debug)]
struct ProjectSnapshot {
    root: PathBuf,
    slug: ProjectSlug,
    name: String,
    manifest: ProjectManifest,
    board: Option<TaskBoard>,
    requirements: Option<Requirements>,
    progress: Option<Vec<NewActivity>>,
}

/// `Ok(None)` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|err| Error::malformed(path, err))
}

fn read_manifest(path: &Path) -> Result<Option<ProjectManifest>> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&bytes).map_err(|err| Error::malformed(path, err))?;
    if text.trim().is_empty() {
        return Ok(Some(ProjectManifest::default()));
    }
    // A document that is just `~` or `null` declares nothing.
    let manifest: Option<ProjectManifest> =
        serde_yaml::from_str(text).map_err(|err| Error::malformed(path, err))?;
    Ok(Some(manifest.unwrap_or_default()))
}

/// Parse the progress log line by line. Lines that are not UTF-8, not JSON
/// objects, or carry an unusable timestamp are skipped.
fn read_progress(path: &Path) -> Result<Option<Vec<NewActivity>>> {
    let Some(bytes) = read_optional(path)? else {
        return Ok(None);
    };

    let mut entries = Vec::new();
    for (index, raw) in bytes.split(|b| *b == b'\n').enumerate() {
        let line_no = index + 1;
        let Ok(line) = std::str::from_utf8(raw) else {
            tracing::debug!(path = %path.display(), line = line_no, "Skipping non-UTF-8 progress line");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let entry: ProgressEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(path = %path.display(), line = line_no, error = %err, "Skipping malformed progress line");
                continue;
            }
        };

        let Some(timestamp) = normalize_source_timestamp(&entry.timestamp) else {
            tracing::debug!(
                path = %path.display(),
                line = line_no,
                timestamp = %entry.timestamp,
                "Skipping progress line with unparsable timestamp"
            );
            continue;
        };

        entries.push(NewActivity {
            event_type: entry.event_type,
            story_id: entry.story_id,
            agent_name: entry.agent,
            summary: entry.summary,
            metadata: entry.metadata,
            timestamp,
        });
    }

    Ok(Some(entries))
}

fn dir_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read phase. `Ok(None)` when `root` is not (or no longer) a project root.
fn read_snapshot(root: &Path) -> Result<Option<ProjectSnapshot>> {
    let root = match std::fs::canonicalize(root) {
        Ok(root) => root,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let manifest_path = ProjectFile::Manifest.path_in(&root);
    let Some(manifest) = read_manifest(&manifest_path)? else {
        return Ok(None);
    };

    let name = manifest
        .project
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| dir_name(&root));

    let mut slug = ProjectSlug::from_name(&name);
    if slug.is_empty() {
        slug = ProjectSlug::from_name(&dir_name(&root));
    }
    if slug.is_empty() {
        return Err(Error::malformed(
            manifest_path,
            format!("project name {:?} yields an empty identifier", name),
        ));
    }

    let board = read_json::<TaskBoard>(&ProjectFile::TaskBoard.path_in(&root))?;
    let requirements = read_json::<Requirements>(&ProjectFile::Requirements.path_in(&root))?;
    let progress = read_progress(&ProjectFile::Progress.path_in(&root))?;

    Ok(Some(ProjectSnapshot {
        root,
        slug,
        name,
        manifest,
        board,
        requirements,
        progress,
    }))
}

impl ProjectSnapshot {
    fn task_records(&self, board: &TaskBoard, updated_at: &str) -> Vec<TaskRecord> {
        board
            .entries()
            .map(|(status, task)| TaskRecord {
                project: self.slug.clone(),
                id: task.id.clone(),
                story_id: task.story_id.clone(),
                title: task.title.clone(),
                description: task.description.clone(),
                status,
                domain: task.domain.clone(),
                complexity: task.complexity.clone(),
                blocked_reason: task.blocked_reason.clone(),
                assigned_agent: task.assigned_agent.clone(),
                priority: task.priority,
                updated_at: Some(updated_at.to_string()),
            })
            .collect()
    }

    /// Write phase: one transaction for the whole project.
    fn write(self, store: &Store) -> Result<IngestOutcome> {
        let synced_at = now_timestamp();

        store.with_db(|db| {
            let tx = db.begin()?;

            tx.upsert_project(&ProjectUpsert {
                slug: self.slug.clone(),
                name: self.name.clone(),
                path: self.root.display().to_string(),
                branch_name: self.manifest.branch_prefix.clone(),
                description: self.manifest.description.clone(),
                last_synced: synced_at.clone(),
            })?;

            let tasks = match &self.board {
                Some(board) => {
                    let records = self.task_records(board, &synced_at);
                    Some(tx.replace_tasks(&self.slug, &records)?)
                }
                None => None,
            };

            let stories = match &self.requirements {
                Some(requirements) => {
                    let counts = (requirements.total_stories(), requirements.done_stories());
                    tx.set_story_counts(&self.slug, counts.0, counts.1)?;
                    Some(counts)
                }
                None => None,
            };

            let mut activity_added = 0;
            if let Some(entries) = &self.progress {
                let mut cursor = tx.latest_activity_timestamp(&self.slug)?;
                for entry in entries {
                    if cursor.as_deref().is_some_and(|seen| entry.timestamp.as_str() <= seen) {
                        continue;
                    }
                    tx.append_activity(&self.slug, entry)?;
                    cursor = Some(entry.timestamp.clone());
                    activity_added += 1;
                }
            }

            tx.commit()?;

            Ok(IngestOutcome {
                slug: self.slug.clone(),
                root: self.root.clone(),
                tasks,
                stories,
                activity_added,
            })
        })
    }
}

/// Mirror one project root into the store.
///
/// Returns `Ok(None)` without touching the store when `root` has no project
/// marker. A malformed marker, task board or requirements file fails the
/// call before anything is written; the store keeps its prior state.
pub fn ingest(store: &Store, root: &Path) -> Result<Option<IngestOutcome>> {
    let Some(snapshot) = read_snapshot(root)? else {
        tracing::debug!(root = %root.display(), "No project marker, nothing to ingest");
        return Ok(None);
    };

    let outcome = snapshot.write(store)?;
    tracing::debug!(
        project = %outcome.slug,
        root = %outcome.root.display(),
        tasks = ?outcome.tasks,
        activity_added = outcome.activity_added,
        "Ingested project"
    );
    Ok(Some(outcome))
}

/// Discover every project under `roots` and ingest each once.
///
/// Returns the number of projects discovered. A project that fails to ingest
/// is logged and skipped; only an unavailable store aborts the pass.
pub fn ingest_all(store: &Store, roots: &[PathBuf], max_depth: usize) -> Result<usize> {
    let projects = discover_projects(roots, max_depth);

    for root in &projects {
        match ingest(store, root) {
            Ok(_) => {}
            Err(err) if err.is_store_unavailable() => return Err(err),
            Err(err) => {
                tracing::error!(root = %root.display(), error = %err, "Failed to ingest project");
            }
        }
    }

    tracing::info!(projects = projects.len(), "Initial ingest complete");
    Ok(projects.len())
}
