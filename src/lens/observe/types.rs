//! Output types of the observation lens

use crate::database::{AsnCount, ObservationRecord};
use serde::{Deserialize, Serialize};

/// Result of one ping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingOutcome {
    pub token: String,
    pub ip: String,
    pub asn: Option<u32>,
    pub as_name: Option<String>,
    pub prefix: Option<String>,
    /// The address had already been observed; nothing new was stored
    pub duplicate: bool,
}

impl PingOutcome {
    pub(crate) fn from_record(token: &str, record: ObservationRecord) -> Self {
        Self {
            token: token.to_string(),
            ip: record.ip,
            asn: record.asn,
            as_name: record.as_name,
            prefix: record.prefix,
            duplicate: true,
        }
    }
}

/// A stored ping as shown in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingRow {
    /// RFC 3339 timestamp, second precision
    pub when: String,
    pub token: String,
    pub ip: String,
    pub asn: Option<u32>,
    pub as_name: Option<String>,
    pub prefix: Option<String>,
    pub user_agent: Option<String>,
}

impl From<ObservationRecord> for PingRow {
    fn from(record: ObservationRecord) -> Self {
        Self {
            when: record
                .created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            token: record.token,
            ip: record.ip,
            asn: record.asn,
            as_name: record.as_name,
            prefix: record.prefix,
            user_agent: record.user_agent,
        }
    }
}

/// Aggregate view of the observation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingStats {
    pub total_hits: u64,
    pub unique_ips: u64,
    pub top: Vec<AsnCount>,
}
