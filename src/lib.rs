#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! asnwatch - origin AS resolution over WHOIS
//!
//! asnwatch maps IP addresses to the autonomous system that originates them.
//! Team Cymru's WHOIS service is asked first and the RADb routing registry is
//! the fallback. On top of the resolver sit an observation log that records
//! each pinging address once, a BIND query-log analyzer and a small HTTP API.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | CLI binary and HTTP API server (default) | `clap`, `axum`, `tower-http` |
//!
//! ```toml
//! # Library only
//! asnwatch = { version = "0.1", default-features = false }
//!
//! # Library with table rendering
//! asnwatch = { version = "0.1", default-features = false, features = ["display"] }
//! ```
//!
//! # Architecture
//!
//! - **[`lens`]**: business logic
//!   - `whois`: address normalization, WHOIS transport, Cymru and RADb
//!     parsers, primary/fallback resolution
//!   - `observe`: ping observations, stored once per address
//!   - `querylog`: BIND query-log statistics and prefix filtering
//!   - `utils`: output formats
//! - **[`database`]**: SQLite storage of observations
//! - **[`config`]**: configuration file and environment handling
//! - **`server`**: HTTP API (requires `cli`)
//!
//! # Quick Start
//!
//! ## Resolving addresses
//!
//! ```rust,ignore
//! use asnwatch::lens::whois::WhoisLens;
//!
//! let lens = WhoisLens::new();
//! let result = lens.resolve("8.8.8.8").await?;
//! if let Some(best) = &result.best {
//!     println!("AS{} via {}", best.asn, best.source.name());
//! }
//!
//! // many addresses over one Team Cymru connection
//! let lookup = lens.bulk_lookup(&["1.1.1.1".to_string(), "9.9.9.9".to_string()]).await?;
//! ```
//!
//! ## Recording observations
//!
//! ```rust,ignore
//! use asnwatch::lens::observe::ObserveLens;
//! use asnwatch::AsnwatchConfig;
//!
//! let config = AsnwatchConfig::new(&None)?;
//! let lens = ObserveLens::from_config(&config)?;
//!
//! let outcome = lens.observe("page-token", "203.0.113.7", Some("curl/8.0")).await?;
//! println!("duplicate: {}", outcome.duplicate);
//! ```

pub mod config;
pub mod database;
pub mod lens;

// Server module - requires CLI feature
#[cfg(feature = "cli")]
pub mod server;

// =============================================================================
// Configuration
// =============================================================================

pub use config::AsnwatchConfig;

pub use config::{format_size, get_sqlite_info, SqliteDatabaseInfo};

// =============================================================================
// Database
// =============================================================================

pub use database::AsnwatchDatabase;

pub use database::{DatabaseConn, SchemaDefinitions, SchemaManager, SchemaStatus, SCHEMA_VERSION};

pub use database::{
    AsnCount, IngestOutcome, NewObservation, ObservationRecord, ObservationRepository,
};

// =============================================================================
// Lenses
// =============================================================================

pub use lens::utils::OutputFormat;

pub use lens::whois::{
    normalize_address, BulkLookup, ResolutionResult, SourceAnswer, WhoisError, WhoisLens,
    WhoisSource, WhoisTransport,
};

pub use lens::observe::{ObserveLens, PingOutcome, PingStats};

pub use lens::querylog::{QueryLogLens, QueryLogReport};

// =============================================================================
// Server - requires "cli" feature
// =============================================================================

#[cfg(feature = "cli")]
pub use server::{create_axum_router, start_server, ApiError, ServerConfig, ServerState};
