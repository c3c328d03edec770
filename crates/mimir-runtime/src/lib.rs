//! Runtime for mirroring project directories into the store.
//!
//! - [`discovery`] finds project roots under the configured watch paths
//! - [`ingest`] reads one project root and commits it in a single transaction
//! - [`watcher`] turns filesystem notifications into debounced [`FileChange`]s
//! - [`bus`] fans change notifications out to live subscribers
//! - [`coordinator`] wires the above together for a running process

pub mod bus;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod ingest;
pub mod watcher;

pub use bus::{BOARD_UPDATED, BusEvent, EventBus, Subscription};
pub use config::{CONFIG_FILE_NAME, Config, resolve_data_dir};
pub use coordinator::{Coordinator, resolve_project_root};
pub use discovery::discover_projects;
pub use error::{Error, Result};
pub use ingest::{IngestOutcome, ingest, ingest_all};
pub use watcher::{FileChange, ProjectWatcher, WatcherConfig};
