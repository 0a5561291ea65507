//! BIND query-log client extraction

use crate::lens::whois::normalize_address;
use anyhow::{anyhow, Result};
use regex::Regex;
use std::net::IpAddr;

/// `client @0x7f2a4c0 192.0.2.53#41234 (example.com): query: ...`
///
/// The `@<id>` part is absent in logs from older BIND releases.
const CLIENT_PATTERN: &str = r"client (?:@\S+ )?([^\s#]+)#\d+";

/// Extracts the querying resolver's address from BIND query-log lines
#[derive(Debug, Clone)]
pub struct QueryLogParser {
    client_re: Regex,
}

impl QueryLogParser {
    pub fn new() -> Result<Self> {
        let client_re = Regex::new(CLIENT_PATTERN)
            .map_err(|e| anyhow!("Failed to compile query-log pattern: {}", e))?;
        Ok(Self { client_re })
    }

    /// Client address of a query line, if the line has a valid one
    pub fn client_address(&self, line: &str) -> Option<IpAddr> {
        let captures = self.client_re.captures(line)?;
        normalize_address(captures.get(1)?.as_str()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_bind_line() {
        let parser = QueryLogParser::new().unwrap();
        let line = "12-May-2024 10:00:00.000 queries: info: client @0x7f2a4c012345 192.0.2.53#41234 \
                    (example.com): query: example.com IN A +E(0)K (198.51.100.1)";
        assert_eq!(
            parser.client_address(line),
            Some("192.0.2.53".parse().unwrap())
        );
    }

    #[test]
    fn test_ipv6_client_is_canonicalized() {
        let parser = QueryLogParser::new().unwrap();
        let line = "client @0x1 2001:DB8:0:0::35#5353 (example.com): query: example.com IN AAAA";
        assert_eq!(
            parser.client_address(line),
            Some("2001:db8::35".parse().unwrap())
        );
    }

    #[test]
    fn test_legacy_line_without_client_id() {
        let parser = QueryLogParser::new().unwrap();
        let line = "client 203.0.113.9#53: query: example.org IN MX +";
        assert_eq!(
            parser.client_address(line),
            Some("203.0.113.9".parse().unwrap())
        );
    }

    #[test]
    fn test_lines_without_valid_client() {
        let parser = QueryLogParser::new().unwrap();
        for line in [
            "",
            "general: info: zone example.com/IN: loaded serial 1",
            "client @0x1 not-an-ip#53 (x): query: x IN A",
            "client @0x1 192.0.2.1 (x): query: x IN A",
        ] {
            assert_eq!(parser.client_address(line), None, "line {line:?}");
        }
    }
}
