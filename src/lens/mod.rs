//! Lens module
//!
//! Lenses combine business logic with output types and are shared by the CLI
//! and the HTTP API.
//!
//! | Lens | Purpose |
//! |------|---------|
//! | `WhoisLens` | IP → origin AS over WHOIS (Team Cymru, then RADb) |
//! | `ObserveLens` | Record pinging clients once per address, with AS enrichment |
//! | `QueryLogLens` | Resolver statistics and prefix filtering for BIND query logs |
//!
//! ```rust,ignore
//! use asnwatch::lens::whois::WhoisLens;
//! use asnwatch::lens::querylog::{read_log_lines, QueryLogLens};
//!
//! let lens = QueryLogLens::new(WhoisLens::new())?;
//! let report = lens.analyze(read_log_lines("query.log".as_ref())?, 15).await;
//! ```

pub mod utils;

pub mod observe;
pub mod querylog;
pub mod whois;
