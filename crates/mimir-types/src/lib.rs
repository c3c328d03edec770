//! Shared schemas for the files a project directory carries and the
//! identifiers derived from them.

pub mod formats;
pub mod project;
pub mod task;
mod timestamp;

pub use formats::{ProgressEntry, ProjectManifest, Requirements, TaskBoard, TaskEntry};
pub use project::{ProjectFile, ProjectSlug};
pub use task::TaskStatus;
pub use timestamp::{normalize_source_timestamp, now_timestamp};
