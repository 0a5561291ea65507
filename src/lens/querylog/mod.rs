//! DNS query-log lens
//!
//! Works on BIND query logs: counts queries per resolver and annotates the
//! busiest resolvers with their origin AS, or keeps only the lines coming
//! from a set of watched prefixes.

mod parser;

pub use parser::QueryLogParser;

use crate::lens::whois::{TcpTransport, WhoisLens, WhoisTransport};
use anyhow::{anyhow, Result};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Query count of one resolver, annotated with its AS when known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverCount {
    pub ip: String,
    pub count: u64,
    pub asn: Option<u32>,
    pub as_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogReport {
    /// Lines with a client address
    pub total_queries: u64,
    pub unique_resolvers: u64,
    /// Busiest resolvers, most queries first
    pub top: Vec<ResolverCount>,
    /// Set when the AS lookup failed and `top` carries no annotations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_error: Option<String>,
}

/// Read a log file, replacing undecodable bytes
pub fn read_log_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow!("Failed to read log file {}: {}", path.display(), e))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

pub struct QueryLogLens<T: WhoisTransport = TcpTransport> {
    parser: QueryLogParser,
    whois: WhoisLens<T>,
}

impl<T: WhoisTransport> QueryLogLens<T> {
    pub fn new(whois: WhoisLens<T>) -> Result<Self> {
        Ok(Self {
            parser: QueryLogParser::new()?,
            whois,
        })
    }

    /// Count queries per resolver and annotate the `top` busiest ones
    ///
    /// Annotation is one bulk lookup for the selected resolvers. Ties in the
    /// ranking keep the order in which resolvers first appear in the log.
    pub async fn analyze<I, S>(&self, lines: I, top: usize) -> QueryLogReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut total_queries = 0u64;
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<(String, u64)> = Vec::new();

        for line in lines {
            let Some(address) = self.parser.client_address(line.as_ref()) else {
                continue;
            };
            total_queries += 1;
            let ip = address.to_string();
            match index.get(&ip) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(ip.clone(), counts.len());
                    counts.push((ip, 1));
                }
            }
        }

        let unique_resolvers = counts.len() as u64;
        // stable sort keeps first-seen order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top);

        let ips: Vec<String> = counts.iter().map(|(ip, _)| ip.clone()).collect();
        let (lookup, lookup_error) = if ips.is_empty() {
            (None, None)
        } else {
            match self.whois.bulk_lookup(&ips).await {
                Ok(lookup) => (Some(lookup), None),
                Err(e) => {
                    warn!("AS lookup for query-log resolvers failed: {}", e);
                    (None, Some(e.to_string()))
                }
            }
        };

        let top = counts
            .into_iter()
            .map(|(ip, count)| {
                let answer = lookup.as_ref().and_then(|l| l.get(&ip));
                ResolverCount {
                    asn: answer.and_then(|a| a.asn),
                    as_name: answer.and_then(|a| a.as_name.clone()),
                    ip,
                    count,
                }
            })
            .collect();

        QueryLogReport {
            total_queries,
            unique_resolvers,
            top,
            lookup_error,
        }
    }

    /// Lines whose client address lies inside any of `networks`, trimmed
    pub fn filter<I, S>(&self, lines: I, networks: &[IpNet]) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .filter_map(|line| {
                let line = line.as_ref();
                let address = self.parser.client_address(line)?;
                networks
                    .iter()
                    .any(|net| net.contains(&address))
                    .then(|| line.trim().to_string())
            })
            .collect()
    }
}
