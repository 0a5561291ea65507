//! WHOIS resolution lens
//!
//! Resolves an IP address to its origin AS by asking WHOIS-style servers in a
//! fixed preference order: Team Cymru first (rich answers with AS names), then
//! RADb (route objects, most specific prefix wins).
//!
//! ```rust,ignore
//! use asnwatch::lens::whois::WhoisLens;
//!
//! let lens = WhoisLens::new();
//! let result = lens.resolve("8.8.8.8").await?;
//! println!("{:?} {:?}", result.asn(), result.as_name());
//! ```

mod address;
pub mod cymru;
mod error;
pub mod radb;
#[cfg(test)]
pub(crate) mod testing;
mod transport;
mod types;

pub use address::{canonical_address, normalize_address};
pub use error::WhoisError;
pub use transport::{TcpTransport, WhoisTransport, MAX_RESPONSE_BYTES};
pub use types::{
    default_sources, select_best, BestAnswer, BulkLookup, ResolutionResult, SourceAnswer,
    SourceEndpoint, SourceOutcome, SourceReport, WhoisSource, CYMRU_WHOIS_SERVER,
    RADB_WHOIS_SERVER, WHOIS_PORT,
};

use crate::config::AsnwatchConfig;
use futures::future::join_all;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info};

/// Default per-query deadline
pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(6);

/// WHOIS resolution lens
///
/// Sources are tried one after another and resolution stops at the first
/// source that names an AS. Each source gets its own deadline.
pub struct WhoisLens<T: WhoisTransport = TcpTransport> {
    transport: T,
    sources: Vec<SourceEndpoint>,
    timeout: Duration,
}

impl WhoisLens<TcpTransport> {
    /// Lens over plain TCP against the public servers
    pub fn new() -> Self {
        Self::with_transport(TcpTransport::new())
    }

    /// Lens using the hosts, port and timeout from the configuration
    pub fn from_config(config: &AsnwatchConfig) -> Self {
        Self::new()
            .with_sources(vec![
                SourceEndpoint::new(WhoisSource::Cymru, &config.cymru_host, config.whois_port),
                SourceEndpoint::new(WhoisSource::Radb, &config.radb_host, config.whois_port),
            ])
            .with_timeout(config.whois_timeout())
    }
}

impl Default for WhoisLens<TcpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WhoisTransport> WhoisLens<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            sources: default_sources(),
            timeout: DEFAULT_WHOIS_TIMEOUT,
        }
    }

    /// Replace the ordered source list
    pub fn with_sources(mut self, sources: Vec<SourceEndpoint>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sources(&self) -> &[SourceEndpoint] {
        &self.sources
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve one address
    ///
    /// Fails only when `input` is not an IP address; no server is contacted in
    /// that case. Timeouts and connection failures are recorded in the
    /// per-source report and resolution moves on to the next source.
    pub async fn resolve(&self, input: &str) -> Result<ResolutionResult, WhoisError> {
        let address = normalize_address(input)?;

        let mut reports = Vec::with_capacity(self.sources.len());
        for endpoint in &self.sources {
            let outcome = self.query_source(endpoint, address).await;
            let usable = outcome.usable_answer().is_some();
            reports.push(SourceReport {
                source: endpoint.source,
                server: endpoint.server(),
                outcome,
            });
            if usable {
                break;
            }
        }

        let result = ResolutionResult::new(address, reports);
        match &result.best {
            Some(best) => debug!("{} resolved to AS{} via {}", result.ip, best.asn, best.source),
            None => debug!("{} could not be resolved by any source", result.ip),
        }
        Ok(result)
    }

    /// Resolve several addresses concurrently, preserving input order
    pub async fn resolve_many(
        &self,
        inputs: &[String],
    ) -> Vec<Result<ResolutionResult, WhoisError>> {
        join_all(inputs.iter().map(|input| self.resolve(input))).await
    }

    /// Look up many addresses over a single connection
    ///
    /// Uses the first configured source that accepts bulk requests. Inputs that
    /// are not IP addresses are reported in [`BulkLookup::rejected`]. When no
    /// bulk-capable source is configured, addresses are resolved one by one.
    pub async fn bulk_lookup(&self, inputs: &[String]) -> Result<BulkLookup, WhoisError> {
        let mut lookup = BulkLookup::default();
        let mut addresses: Vec<IpAddr> = Vec::new();
        for input in inputs {
            match normalize_address(input) {
                Ok(address) if !addresses.contains(&address) => addresses.push(address),
                Ok(_) => {}
                Err(_) => lookup.rejected.push(input.clone()),
            }
        }
        if addresses.is_empty() {
            return Ok(lookup);
        }

        let Some(endpoint) = self.sources.iter().find(|e| e.source.supports_bulk()) else {
            debug!("no bulk-capable source configured, resolving individually");
            for address in addresses {
                let result = self.resolve(&address.to_string()).await?;
                if let Some(answer) = result
                    .sources
                    .iter()
                    .find_map(|r| r.outcome.usable_answer())
                {
                    lookup.answers.insert(result.ip.clone(), answer.clone());
                }
            }
            return Ok(lookup);
        };

        info!(
            "bulk lookup of {} addresses via {}",
            addresses.len(),
            endpoint.server()
        );
        let payload = cymru::bulk_query(&addresses);
        let response = self
            .transport
            .query(&endpoint.host, endpoint.port, &payload, self.timeout)
            .await?;

        for answer in cymru::parse_bulk_response(&response) {
            // the server echoes addresses; re-canonicalize so lookups by our form work
            let key = canonical_address(&answer.ip).unwrap_or_else(|_| answer.ip.clone());
            lookup.answers.entry(key).or_insert(answer);
        }
        Ok(lookup)
    }

    /// Query a single source and classify what came back
    pub async fn query_source(&self, endpoint: &SourceEndpoint, address: IpAddr) -> SourceOutcome {
        let payload = endpoint.source.build_query(address);
        match self
            .transport
            .query(&endpoint.host, endpoint.port, &payload, self.timeout)
            .await
        {
            Ok(response) => match endpoint.source.parse_answer(&response, address) {
                Some(answer) => SourceOutcome::Answered(answer),
                None => SourceOutcome::Empty,
            },
            Err(e) => {
                debug!("{} query for {} failed: {}", endpoint.source, address, e);
                SourceOutcome::Failed(e)
            }
        }
    }
}
