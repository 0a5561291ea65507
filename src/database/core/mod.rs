//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper with asnwatch's pragmas
//! - `SchemaManager`: schema initialization and version checks

mod connection;
mod schema;

pub use connection::{DatabaseConn, DEFAULT_BUSY_TIMEOUT};
pub use schema::{SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};
