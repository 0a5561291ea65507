//! Observation repository
//!
//! The unique index on `token_hits.ip` is the source of truth for "first
//! observation wins". [`ObservationRepository::exists`] is only a shortcut;
//! [`ObservationRepository::record_if_absent`] maps a constraint violation to
//! [`IngestOutcome::Duplicate`].

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

const RECORD_COLUMNS: &str = "id, token, ip, asn, as_name, prefix, user_agent, created_at";

/// An observation to be stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewObservation {
    pub token: String,
    /// Canonical client address; the deduplication key
    pub ip: String,
    pub asn: Option<u32>,
    pub as_name: Option<String>,
    pub prefix: Option<String>,
    pub user_agent: Option<String>,
}

impl NewObservation {
    pub fn new(token: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ip: ip.into(),
            ..Default::default()
        }
    }
}

/// A stored observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: i64,
    pub token: String,
    pub ip: String,
    pub asn: Option<u32>,
    pub as_name: Option<String>,
    pub prefix: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ObservationRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: i64 = row.get(7)?;
        Ok(Self {
            id: row.get(0)?,
            token: row.get(1)?,
            ip: row.get(2)?,
            asn: row.get(3)?,
            as_name: row.get(4)?,
            prefix: row.get(5)?,
            user_agent: row.get(6)?,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        })
    }
}

/// Result of an ingestion attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestOutcome {
    /// A new row was stored
    Created,
    /// A row for the same address already existed; nothing was written
    Duplicate,
}

/// Hit count for one (asn, as_name) group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnCount {
    pub asn: Option<u32>,
    pub as_name: Option<String>,
    pub count: u64,
}

pub struct ObservationRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ObservationRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Whether an observation for `ip` is already stored
    pub fn exists(&self, ip: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM token_hits WHERE ip = ?1 LIMIT 1",
                [ip],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| anyhow!("Failed to check observation for {}: {}", ip, e))?;
        Ok(found.is_some())
    }

    pub fn find_by_ip(&self, ip: &str) -> Result<Option<ObservationRecord>> {
        let sql = format!("SELECT {} FROM token_hits WHERE ip = ?1", RECORD_COLUMNS);
        self.conn
            .query_row(&sql, [ip], ObservationRecord::from_row)
            .optional()
            .map_err(|e| anyhow!("Failed to load observation for {}: {}", ip, e))
    }

    /// Store `observation` unless its address is already present
    pub fn record_if_absent(&self, observation: &NewObservation) -> Result<IngestOutcome> {
        let result = self.conn.execute(
            r#"
            INSERT INTO token_hits (token, ip, asn, as_name, prefix, user_agent, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                observation.token,
                observation.ip,
                observation.asn,
                observation.as_name,
                observation.prefix,
                observation.user_agent,
                Utc::now().timestamp(),
            ],
        );

        match result {
            Ok(_) => Ok(IngestOutcome::Created),
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                debug!("observation for {} already stored", observation.ip);
                Ok(IngestOutcome::Duplicate)
            }
            Err(e) => Err(anyhow!(
                "Failed to store observation for {}: {}",
                observation.ip,
                e
            )),
        }
    }

    /// Total number of stored observations
    pub fn count(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM token_hits", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to count observations: {}", e))
    }

    pub fn unique_ips(&self) -> Result<u64> {
        self.conn
            .query_row("SELECT COUNT(DISTINCT ip) FROM token_hits", [], |row| {
                row.get(0)
            })
            .map_err(|e| anyhow!("Failed to count distinct addresses: {}", e))
    }

    /// Most frequent (asn, as_name) groups, largest first
    pub fn top_asns(&self, limit: usize) -> Result<Vec<AsnCount>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT asn, as_name, COUNT(*) AS cnt
                FROM token_hits
                GROUP BY asn, as_name
                ORDER BY cnt DESC, asn ASC
                LIMIT ?1
                "#,
            )
            .map_err(|e| anyhow!("Failed to prepare AS statistics query: {}", e))?;

        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(AsnCount {
                    asn: row.get(0)?,
                    as_name: row.get(1)?,
                    count: row.get(2)?,
                })
            })
            .map_err(|e| anyhow!("Failed to query AS statistics: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read AS statistics: {}", e))
    }

    /// The `limit` newest observations
    pub fn last(&self, limit: usize) -> Result<Vec<ObservationRecord>> {
        let sql = format!(
            "SELECT {} FROM token_hits ORDER BY created_at DESC, id DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| anyhow!("Failed to prepare observation query: {}", e))?;

        let rows = stmt
            .query_map([limit as i64], ObservationRecord::from_row)
            .map_err(|e| anyhow!("Failed to query observations: {}", e))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| anyhow!("Failed to read observations: {}", e))
    }

    /// Delete every observation, returning how many were removed
    pub fn clear(&self) -> Result<u64> {
        let deleted = self
            .conn
            .execute("DELETE FROM token_hits", [])
            .map_err(|e| anyhow!("Failed to clear observations: {}", e))?;
        Ok(deleted as u64)
    }
}
