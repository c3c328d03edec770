//! TestWorld pattern for declarative test setup.

use assert_cmd::Command;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated directory tree of project roots.
///
/// All paths handed out are canonical, matching what discovery and the
/// watcher report.
///
/// # Example
/// ```no_run
/// use mimir_testing::{TestWorld, fixtures};
///
/// let world = TestWorld::new().with_project("apps/demo", "Demo");
/// world.write_requirements("apps/demo", &fixtures::requirements(3, 1));
/// assert!(world.path("apps/demo/ullr.yaml").exists());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    root: PathBuf,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir
            .path()
            .canonicalize()
            .expect("Failed to canonicalize temp dir");
        Self { temp_dir, root }
    }

    /// Canonical root of the tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Store location kept inside a hidden directory so discovery ignores it.
    pub fn db_path(&self) -> PathBuf {
        self.root.join(".mimir").join("mimir.db")
    }

    /// Create a directory (and parents).
    pub fn with_dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.path(rel)).expect("Failed to create directory");
        self
    }

    /// Create a project root declaring `name`.
    pub fn with_project(self, rel: &str, name: &str) -> Self {
        self.write_manifest(rel, &format!("project: {:?}\nbranch_prefix: ralph/\n", name));
        self
    }

    /// Write any file below the root, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("Failed to write file");
    }

    pub fn write_manifest(&self, project: &str, yaml: &str) {
        self.write_file(&format!("{}/ullr.yaml", project), yaml);
    }

    pub fn write_taskboard(&self, project: &str, board: &Value) {
        self.write_file(&format!("{}/taskboard.json", project), &board.to_string());
    }

    pub fn write_requirements(&self, project: &str, prd: &Value) {
        self.write_file(&format!("{}/prd.json", project), &prd.to_string());
    }

    /// Replace the progress log with `lines`.
    pub fn write_progress(&self, project: &str, lines: &[String]) {
        let mut contents = lines.join("\n");
        contents.push('\n');
        self.write_file(&format!("{}/progress.jsonl", project), &contents);
    }

    /// Append one line, creating the log if needed.
    pub fn append_progress(&self, project: &str, line: &str) {
        let path = self.path(format!("{}/progress.jsonl", project));
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .expect("Failed to open progress log");
        writeln!(file, "{}", line).expect("Failed to append progress line");
    }

    /// Point a `mimir` command at this tree: its store, and the root as the
    /// only watch path. The working directory is the root so no stray
    /// `mimir.toml` from the host is picked up.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--db")
            .arg(self.db_path())
            .arg("--watch")
            .arg(self.root())
            .current_dir(self.root())
            .env("MIMIR_PATH", self.root().join(".mimir"))
            .env_remove("RUST_LOG")
    }
}
