//! Types shared by the WHOIS resolution lens

use super::error::WhoisError;
use super::{cymru, radb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Default WHOIS port
pub const WHOIS_PORT: u16 = 43;

/// Team Cymru bulk WHOIS server
pub const CYMRU_WHOIS_SERVER: &str = "whois.cymru.com";

/// RADb routing registry WHOIS server
pub const RADB_WHOIS_SERVER: &str = "whois.radb.net";

// =============================================================================
// Sources
// =============================================================================

/// An upstream WHOIS dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhoisSource {
    /// Team Cymru bulk verbose mode (pipe-separated table)
    Cymru,
    /// RADb route objects (RPSL blocks)
    Radb,
}

impl WhoisSource {
    pub fn name(&self) -> &'static str {
        match self {
            WhoisSource::Cymru => "cymru",
            WhoisSource::Radb => "radb",
        }
    }

    pub fn default_host(&self) -> &'static str {
        match self {
            WhoisSource::Cymru => CYMRU_WHOIS_SERVER,
            WhoisSource::Radb => RADB_WHOIS_SERVER,
        }
    }

    /// Whether one request can carry many addresses
    pub fn supports_bulk(&self) -> bool {
        matches!(self, WhoisSource::Cymru)
    }

    /// Build the request payload for a single address
    pub fn build_query(&self, address: IpAddr) -> String {
        match self {
            WhoisSource::Cymru => cymru::bulk_query(&[address]),
            WhoisSource::Radb => radb::route_query(address),
        }
    }

    /// Extract this source's answer for `address` from a raw response
    pub fn parse_answer(&self, response: &str, address: IpAddr) -> Option<SourceAnswer> {
        match self {
            WhoisSource::Cymru => cymru::answer_for(response, address),
            WhoisSource::Radb => radb::answer_for(response, address),
        }
    }
}

impl fmt::Display for WhoisSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A source together with the server it is reached at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEndpoint {
    pub source: WhoisSource,
    pub host: String,
    pub port: u16,
}

impl SourceEndpoint {
    pub fn new(source: WhoisSource, host: impl Into<String>, port: u16) -> Self {
        Self {
            source,
            host: host.into(),
            port,
        }
    }

    /// Endpoint at the source's public server on port 43
    pub fn default_for(source: WhoisSource) -> Self {
        Self::new(source, source.default_host(), WHOIS_PORT)
    }

    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The default preference order: Cymru first, RADb as fallback
pub fn default_sources() -> Vec<SourceEndpoint> {
    vec![
        SourceEndpoint::default_for(WhoisSource::Cymru),
        SourceEndpoint::default_for(WhoisSource::Radb),
    ]
}

// =============================================================================
// Answers
// =============================================================================

/// What one source said about one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAnswer {
    /// Source that produced this answer
    pub source: WhoisSource,
    /// Address as echoed by the source
    pub ip: String,
    /// Origin AS number, absent when the source could not name one
    pub asn: Option<u32>,
    /// AS description (Cymru only)
    pub as_name: Option<String>,
    /// Covering network prefix
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated: Option<String>,
}

impl SourceAnswer {
    /// An answer is usable when it carries an AS number
    pub fn is_usable(&self) -> bool {
        self.asn.is_some()
    }
}

/// Result of querying a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// The source returned a record for the address
    Answered(SourceAnswer),
    /// The source responded without a record for the address
    Empty,
    /// The exchange did not complete
    Failed(WhoisError),
}

impl SourceOutcome {
    /// The answer, if it carries an AS number
    pub fn usable_answer(&self) -> Option<&SourceAnswer> {
        match self {
            SourceOutcome::Answered(answer) if answer.is_usable() => Some(answer),
            _ => None,
        }
    }

    pub fn answer(&self) -> Option<&SourceAnswer> {
        match self {
            SourceOutcome::Answered(answer) => Some(answer),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_))
    }
}

/// One entry of a resolution's audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: WhoisSource,
    pub server: String,
    pub outcome: SourceOutcome,
}

/// The reconciled answer for an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestAnswer {
    pub source: WhoisSource,
    pub asn: u32,
    pub as_name: Option<String>,
    pub prefix: Option<String>,
}

impl BestAnswer {
    fn from_answer(answer: &SourceAnswer) -> Option<Self> {
        Some(Self {
            source: answer.source,
            asn: answer.asn?,
            as_name: answer.as_name.clone(),
            prefix: answer.prefix.clone(),
        })
    }
}

/// Fold per-source outcomes into the best answer
///
/// Reports are consulted in query order; the first usable one wins verbatim.
pub fn select_best(reports: &[SourceReport]) -> Option<BestAnswer> {
    reports
        .iter()
        .find_map(|r| r.outcome.usable_answer())
        .and_then(BestAnswer::from_answer)
}

/// Full output of resolving one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// Canonical form of the queried address
    pub ip: String,
    pub best: Option<BestAnswer>,
    /// Every source that was queried, in order
    pub sources: Vec<SourceReport>,
}

impl ResolutionResult {
    pub(crate) fn new(ip: IpAddr, sources: Vec<SourceReport>) -> Self {
        let best = select_best(&sources);
        Self {
            ip: ip.to_string(),
            best,
            sources,
        }
    }

    /// Outcome for a particular source, if it was queried
    pub fn outcome(&self, source: WhoisSource) -> Option<&SourceOutcome> {
        self.sources
            .iter()
            .find(|r| r.source == source)
            .map(|r| &r.outcome)
    }

    pub fn asn(&self) -> Option<u32> {
        self.best.as_ref().map(|b| b.asn)
    }

    pub fn as_name(&self) -> Option<&str> {
        self.best.as_ref().and_then(|b| b.as_name.as_deref())
    }

    pub fn prefix(&self) -> Option<&str> {
        self.best.as_ref().and_then(|b| b.prefix.as_deref())
    }
}

/// Result of a single-connection bulk lookup
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkLookup {
    /// Answers keyed by the address each response line names
    pub answers: BTreeMap<String, SourceAnswer>,
    /// Inputs that failed address validation and were never sent
    pub rejected: Vec<String>,
}

impl BulkLookup {
    pub fn get(&self, ip: &str) -> Option<&SourceAnswer> {
        self.answers.get(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(source: WhoisSource, asn: Option<u32>) -> SourceAnswer {
        SourceAnswer {
            source,
            ip: "192.0.2.1".to_string(),
            asn,
            as_name: asn.map(|_| "EXAMPLE".to_string()),
            prefix: Some("192.0.2.0/24".to_string()),
            country: None,
            registry: None,
            allocated: None,
        }
    }

    fn report(source: WhoisSource, outcome: SourceOutcome) -> SourceReport {
        SourceReport {
            source,
            server: source.default_host().to_string(),
            outcome,
        }
    }

    #[test]
    fn test_select_best_prefers_first_usable() {
        let reports = vec![
            report(
                WhoisSource::Cymru,
                SourceOutcome::Answered(answer(WhoisSource::Cymru, Some(64500))),
            ),
            report(
                WhoisSource::Radb,
                SourceOutcome::Answered(answer(WhoisSource::Radb, Some(64501))),
            ),
        ];
        let best = select_best(&reports).unwrap();
        assert_eq!(best.source, WhoisSource::Cymru);
        assert_eq!(best.asn, 64500);
    }

    #[test]
    fn test_select_best_skips_unusable() {
        let reports = vec![
            report(
                WhoisSource::Cymru,
                SourceOutcome::Answered(answer(WhoisSource::Cymru, None)),
            ),
            report(
                WhoisSource::Radb,
                SourceOutcome::Answered(answer(WhoisSource::Radb, Some(64501))),
            ),
        ];
        let best = select_best(&reports).unwrap();
        assert_eq!(best.source, WhoisSource::Radb);
        assert_eq!(best.asn, 64501);
    }

    #[test]
    fn test_select_best_none() {
        let reports = vec![
            report(WhoisSource::Cymru, SourceOutcome::Empty),
            report(
                WhoisSource::Radb,
                SourceOutcome::Failed(WhoisError::connection("whois.radb.net:43", "refused")),
            ),
        ];
        assert!(select_best(&reports).is_none());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = SourceOutcome::Empty;
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "empty");

        let outcome = SourceOutcome::Answered(answer(WhoisSource::Radb, Some(13335)));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "answered");
        assert_eq!(value["data"]["asn"], 13335);
        assert_eq!(value["data"]["source"], "radb");
    }

    #[test]
    fn test_source_endpoint_server() {
        let endpoint = SourceEndpoint::default_for(WhoisSource::Cymru);
        assert_eq!(endpoint.server(), "whois.cymru.com:43");
        assert_eq!(default_sources()[1].source, WhoisSource::Radb);
    }
}
