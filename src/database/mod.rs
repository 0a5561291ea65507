//! Database module
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # SQLite DatabaseConn wrapper
//! │   └── schema      # Table definitions and schema management
//! │
//! └── observations/   # Persistent storage
//!     └── token_hits  # Observation log with per-address uniqueness
//! ```
//!
//! ```rust,ignore
//! use asnwatch::database::{AsnwatchDatabase, NewObservation};
//!
//! let db = AsnwatchDatabase::open_in_dir("~/.asnwatch")?;
//! let outcome = db.observations().record_if_absent(&NewObservation::new("tok", "8.8.8.8"))?;
//! ```

pub mod core;
pub mod observations;

pub use core::{
    DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, DEFAULT_BUSY_TIMEOUT,
    SCHEMA_VERSION,
};

pub use observations::{
    ensure_data_dir, AsnCount, AsnwatchDatabase, IngestOutcome, NewObservation,
    ObservationRecord, ObservationRepository, DATABASE_FILE_NAME,
};
