use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

static NON_ALNUM_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("static slug pattern"));

/// Stable project identifier derived from the declared project name.
///
/// Lowercased, runs of anything outside `[a-z0-9]` collapsed to a single
/// `-`, leading and trailing separators trimmed. Two names that normalize
/// to the same slug denote the same project record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectSlug(String);

impl ProjectSlug {
    /// Wrap an already-normalized slug (e.g. a value read back from the store).
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// Derive the slug for a declared project name.
    pub fn from_name(name: &str) -> Self {
        let lowered = name.trim().to_lowercase();
        let collapsed = NON_ALNUM_RUN.replace_all(&lowered, "-");
        Self(collapsed.trim_matches('-').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A name made only of punctuation or whitespace yields an empty slug.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProjectSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProjectSlug {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectSlug {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProjectSlug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The four file kinds a project root may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectFile {
    /// Project marker and declaration (`ullr.yaml`).
    Manifest,
    /// Four-column task snapshot (`taskboard.json`).
    TaskBoard,
    /// Story list with pass flags (`prd.json`).
    Requirements,
    /// Append-only activity log (`progress.jsonl`).
    Progress,
}

impl ProjectFile {
    pub const ALL: [ProjectFile; 4] = [
        ProjectFile::Manifest,
        ProjectFile::TaskBoard,
        ProjectFile::Requirements,
        ProjectFile::Progress,
    ];

    pub const MARKER: &'static str = "ullr.yaml";

    pub fn file_name(self) -> &'static str {
        match self {
            ProjectFile::Manifest => Self::MARKER,
            ProjectFile::TaskBoard => "taskboard.json",
            ProjectFile::Requirements => "prd.json",
            ProjectFile::Progress => "progress.jsonl",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }

    /// Classify a path by its final component.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_file_name)
    }

    pub fn path_in(self, root: &Path) -> std::path::PathBuf {
        root.join(self.file_name())
    }
}

impl fmt::Display for ProjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
