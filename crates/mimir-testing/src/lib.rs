//! Testing infrastructure for mimir.
//!
//! - `TestWorld`: lays out project directories in an isolated temp dir
//! - `fixtures`: JSON builders for task boards, requirements and progress lines

pub mod fixtures;
pub mod world;

pub use world::TestWorld;
