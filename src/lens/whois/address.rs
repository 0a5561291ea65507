//! Address validation and canonicalization

use super::error::WhoisError;
use std::net::IpAddr;

/// Parse an IPv4 or IPv6 literal, ignoring surrounding whitespace
///
/// Hostnames, CIDR notation, zone identifiers and out-of-range octets are rejected.
pub fn normalize_address(input: &str) -> Result<IpAddr, WhoisError> {
    input
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| WhoisError::invalid_address(input))
}

/// Canonical textual form of an address (RFC 5952 for IPv6)
pub fn canonical_address(input: &str) -> Result<String, WhoisError> {
    normalize_address(input).map(|ip| ip.to_string())
}
