// SQLite mirror of on-disk project state
// Derived data only: every row can be rebuilt by re-ingesting the project roots

mod db;
mod error;
mod queries;
mod records;
mod schema;
mod store;

// Public API
pub use db::{Database, SyncTransaction};
pub use error::{Error, Result};
pub use records::{
    ActiveAgent, ActivityRecord, NewActivity, ProjectRecord, ProjectUpsert, TaskRecord,
};
pub use schema::SCHEMA_VERSION;
pub use store::Store;
