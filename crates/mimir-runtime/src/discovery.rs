use mimir_types::ProjectFile;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_project_root(dir: &Path) -> bool {
    ProjectFile::Manifest.path_in(dir).is_file()
}

/// Find every directory holding a project marker under `roots`.
///
/// Depth is counted per root (the root itself is depth 0); directories below
/// `max_depth` are not visited. A project root is a leaf: nothing beneath it
/// is examined. Hidden directories are skipped, except a root given
/// explicitly. Unreadable subtrees and missing roots are skipped silently.
///
/// Returned paths are canonical and in traversal order (roots as given,
/// children by file name).
pub fn discover_projects(roots: &[PathBuf], max_depth: usize) -> Vec<PathBuf> {
    let mut projects = Vec::new();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        let root = match std::fs::canonicalize(root) {
            Ok(root) => root,
            Err(err) => {
                tracing::debug!(root = %root.display(), error = %err, "Skipping unavailable watch path");
                continue;
            }
        };

        let mut walker = WalkDir::new(&root)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping inaccessible path during discovery");
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let canonical =
                std::fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
            if !seen.insert(canonical.clone()) {
                walker.skip_current_dir();
                continue;
            }

            if is_project_root(&canonical) {
                tracing::trace!(project = %canonical.display(), depth = entry.depth(), "Found project");
                projects.push(canonical);
                walker.skip_current_dir();
            }
        }
    }

    projects
}
