//! Persistence layer: schema, `SQLite` store, and batched commits.

pub mod batch;
pub mod schema;
pub mod sqlite;

pub use batch::{BatchCommitter, DEFAULT_MAX_BATCH_SIZE, RunSession};
pub use sqlite::{IssueStore, UserEdit};
