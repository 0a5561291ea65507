//! Observation lens
//!
//! Records which addresses ping us, enriched with their origin AS. Each
//! address is stored at most once: the first ping wins and later ones are
//! answered from the stored row.
//!
//! Database work runs on the blocking pool with a fresh connection per
//! operation, so the lens can be shared freely between async tasks.

mod types;

pub use types::{PingOutcome, PingRow, PingStats};

use crate::config::AsnwatchConfig;
use crate::database::{AsnwatchDatabase, IngestOutcome, NewObservation};
use crate::lens::whois::{normalize_address, TcpTransport, WhoisLens, WhoisTransport};
use anyhow::{anyhow, Result};
use tracing::{debug, info};

pub const MAX_TOKEN_LEN: usize = 80;
pub const MAX_USER_AGENT_LEN: usize = 255;

/// Check a client-supplied token: 1 to 80 characters
pub fn validate_token(token: &str) -> Result<()> {
    let len = token.chars().count();
    if len == 0 || len > MAX_TOKEN_LEN {
        return Err(anyhow!(
            "token must be between 1 and {} characters, got {}",
            MAX_TOKEN_LEN,
            len
        ));
    }
    Ok(())
}

fn truncate_user_agent(user_agent: &str) -> String {
    user_agent.chars().take(MAX_USER_AGENT_LEN).collect()
}

pub struct ObserveLens<T: WhoisTransport = TcpTransport> {
    db_path: String,
    whois: WhoisLens<T>,
}

impl ObserveLens<TcpTransport> {
    pub fn from_config(config: &AsnwatchConfig) -> Result<Self> {
        crate::database::ensure_data_dir(&config.data_dir)?;
        Ok(Self::new(config.sqlite_path(), WhoisLens::from_config(config)))
    }
}

impl<T: WhoisTransport> ObserveLens<T> {
    pub fn new(db_path: impl Into<String>, whois: WhoisLens<T>) -> Self {
        Self {
            db_path: db_path.into(),
            whois,
        }
    }

    pub fn whois(&self) -> &WhoisLens<T> {
        &self.whois
    }

    async fn with_db<F, R>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&AsnwatchDatabase) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let db = AsnwatchDatabase::open(&path)?;
            op(&db)
        })
        .await
        .map_err(|e| anyhow!("Database task failed: {}", e))?
    }

    /// Record a ping from `ip`
    ///
    /// An address seen before is answered from storage without contacting any
    /// WHOIS server. Otherwise the address is resolved and stored; if another
    /// request stored it in the meantime, the fresh answer is returned flagged
    /// as a duplicate.
    pub async fn observe(
        &self,
        token: &str,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<PingOutcome> {
        validate_token(token)?;
        let ip = normalize_address(ip)?.to_string();

        let lookup_ip = ip.clone();
        if let Some(record) = self
            .with_db(move |db| db.observations().find_by_ip(&lookup_ip))
            .await?
        {
            debug!("{} already observed, skipping resolution", ip);
            return Ok(PingOutcome::from_record(token, record));
        }

        let resolution = self.whois.resolve(&ip).await?;
        let observation = NewObservation {
            token: token.to_string(),
            ip: ip.clone(),
            asn: resolution.asn(),
            as_name: resolution.as_name().map(str::to_string),
            prefix: resolution.prefix().map(str::to_string),
            user_agent: user_agent.map(truncate_user_agent),
        };

        let to_store = observation.clone();
        let outcome = self
            .with_db(move |db| db.observations().record_if_absent(&to_store))
            .await?;
        if outcome == IngestOutcome::Created {
            info!("new observation {} (token {})", ip, token);
        }

        Ok(PingOutcome {
            token: observation.token,
            ip: observation.ip,
            asn: observation.asn,
            as_name: observation.as_name,
            prefix: observation.prefix,
            duplicate: outcome == IngestOutcome::Duplicate,
        })
    }

    pub async fn stats(&self, top: usize) -> Result<PingStats> {
        self.with_db(move |db| {
            let repo = db.observations();
            Ok(PingStats {
                total_hits: repo.count()?,
                unique_ips: repo.unique_ips()?,
                top: repo.top_asns(top)?,
            })
        })
        .await
    }

    /// The newest `limit` pings, newest first
    pub async fn last(&self, limit: usize) -> Result<Vec<PingRow>> {
        let records = self
            .with_db(move |db| db.observations().last(limit))
            .await?;
        Ok(records.into_iter().map(PingRow::from).collect())
    }

    /// Delete every stored ping, returning how many were removed
    pub async fn clear(&self) -> Result<u64> {
        let deleted = self.with_db(|db| db.observations().clear()).await?;
        info!("cleared {} observations", deleted);
        Ok(deleted)
    }
}
