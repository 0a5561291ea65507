//! Error types for WHOIS resolution

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors produced while resolving an address over WHOIS
///
/// Only [`WhoisError::InvalidAddress`] ever escapes [`super::WhoisLens::resolve`].
/// Transport failures are folded into the per-source outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WhoisError {
    /// Input is not an IPv4 or IPv6 address
    #[error("invalid IP address: {input:?}")]
    InvalidAddress { input: String },

    /// The server did not finish the exchange before the deadline
    #[error("query to {server} timed out after {timeout_ms} ms")]
    Timeout { server: String, timeout_ms: u64 },

    /// Connecting, writing or reading failed
    #[error("connection to {server} failed: {reason}")]
    Connection { server: String, reason: String },
}

impl WhoisError {
    pub fn invalid_address(input: impl Into<String>) -> Self {
        Self::InvalidAddress {
            input: input.into(),
        }
    }

    pub fn timeout(server: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            server: server.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn connection(server: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            server: server.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the network rather than from the input
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WhoisError::invalid_address("not-an-ip");
        assert_eq!(err.to_string(), "invalid IP address: \"not-an-ip\"");

        let err = WhoisError::timeout("whois.cymru.com:43", Duration::from_secs(6));
        assert_eq!(
            err.to_string(),
            "query to whois.cymru.com:43 timed out after 6000 ms"
        );

        let err = WhoisError::connection("whois.radb.net:43", "connection refused");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_is_transport() {
        assert!(!WhoisError::invalid_address("x").is_transport());
        assert!(WhoisError::timeout("a:43", Duration::from_secs(1)).is_transport());
        assert!(WhoisError::connection("a:43", "reset").is_transport());
    }

    #[test]
    fn test_serialize_tagged() {
        let err = WhoisError::timeout("a:43", Duration::from_millis(250));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "timeout");
        assert_eq!(value["timeout_ms"], 250);
    }
}
