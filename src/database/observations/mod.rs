//! asnwatch persistent storage
//!
//! Holds the observation log: one row per client address that pinged us,
//! enriched with the AS data known at the time of the first ping.

mod token_hits;

pub use token_hits::{
    AsnCount, IngestOutcome, NewObservation, ObservationRecord, ObservationRepository,
};

use crate::database::core::{DatabaseConn, SchemaManager, SchemaStatus};
use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// File name of the database inside the data directory
pub const DATABASE_FILE_NAME: &str = "asnwatch.sqlite3";

/// Main asnwatch database
///
/// Opening a file checks its schema. Missing tables and indexes are created in
/// place and existing rows are never dropped; a file written by a newer schema
/// is refused.
pub struct AsnwatchDatabase {
    db: DatabaseConn,
}

impl AsnwatchDatabase {
    pub fn open(path: &str) -> Result<Self> {
        let db = DatabaseConn::open_path(path)?;
        let schema = SchemaManager::new(&db.conn);

        match schema.check_status()? {
            SchemaStatus::Current => {}
            SchemaStatus::NotInitialized => {
                info!("Initializing asnwatch database schema at {}", path);
                schema.initialize()?;
            }
            SchemaStatus::NeedsMigration { from, to } => {
                info!("Upgrading asnwatch database schema from v{} to v{}", from, to);
                schema.initialize()?;
            }
            SchemaStatus::Incompatible {
                database_version,
                required_version,
            } => {
                return Err(anyhow!(
                    "Database at {} uses schema v{}, this asnwatch supports v{}",
                    path,
                    database_version,
                    required_version
                ));
            }
            SchemaStatus::Corrupted => {
                warn!("asnwatch database at {} is missing tables, recreating them", path);
                schema.initialize()?;
            }
        }

        Ok(Self { db })
    }

    /// Open `{data_dir}/asnwatch.sqlite3`, creating the directory if needed
    pub fn open_in_dir(data_dir: &str) -> Result<Self> {
        ensure_data_dir(data_dir)?;
        let path = format!("{}/{}", data_dir.trim_end_matches('/'), DATABASE_FILE_NAME);
        Self::open(&path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = DatabaseConn::open_in_memory()?;
        SchemaManager::new(&db.conn).initialize()?;
        Ok(Self { db })
    }

    pub fn observations(&self) -> ObservationRepository<'_> {
        ObservationRepository::new(&self.db.conn)
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.db.conn
    }
}

pub fn ensure_data_dir(data_dir: &str) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .map_err(|e| anyhow!("Failed to create data directory '{}': {}", data_dir, e))
}
