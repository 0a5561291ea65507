//! Team Cymru bulk WHOIS dialect
//!
//! Request (bulk verbose mode):
//!
//! ```text
//! begin
//! verbose
//! 8.8.8.8
//! 1.1.1.1
//! end
//! ```
//!
//! Response, one line per address after a header:
//!
//! ```text
//! Bulk mode; whois.cymru.com [2024-05-01 10:00:00 +0000]
//! AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name
//! 15169   | 8.8.8.8          | 8.8.8.0/24          | US | arin     | 2014-03-14 | GOOGLE, US
//! ```

use super::types::{SourceAnswer, WhoisSource};
use std::net::IpAddr;

/// First field of the header line
pub const HEADER_SENTINEL: &str = "AS";

/// Number of fields in a verbose record
const VERBOSE_FIELDS: usize = 7;

/// Build a bulk verbose request for the given addresses
pub fn bulk_query(addresses: &[IpAddr]) -> String {
    let mut query = String::from("begin\nverbose\n");
    for address in addresses {
        query.push_str(&address.to_string());
        query.push('\n');
    }
    query.push_str("end\n");
    query
}

/// Parse every qualifying record of a bulk verbose response
///
/// Header lines and lines with fewer than seven fields are skipped.
pub fn parse_bulk_response(text: &str) -> Vec<SourceAnswer> {
    text.lines().filter_map(parse_record).collect()
}

/// Pick the record for `address` out of a response
///
/// Records are matched on the address the server echoed. If none echoes the
/// queried address, the first record is taken, as the server answers a
/// single-address query with a single line.
pub fn answer_for(text: &str, address: IpAddr) -> Option<SourceAnswer> {
    let records = parse_bulk_response(text);
    let wanted = address.to_string();
    let index = records.iter().position(|r| r.ip == wanted).unwrap_or(0);
    records.into_iter().nth(index)
}

fn parse_record(line: &str) -> Option<SourceAnswer> {
    // the AS name is last and may itself contain separators
    let fields: Vec<&str> = line.splitn(VERBOSE_FIELDS, '|').map(str::trim).collect();
    if fields.len() < VERBOSE_FIELDS {
        return None;
    }
    if fields[0].eq_ignore_ascii_case(HEADER_SENTINEL) {
        return None;
    }

    Some(SourceAnswer {
        source: WhoisSource::Cymru,
        ip: fields[1].to_string(),
        asn: fields[0].parse::<u32>().ok(),
        as_name: field_value(fields[6]),
        prefix: field_value(fields[2]),
        country: field_value(fields[3]),
        registry: field_value(fields[4]),
        allocated: field_value(fields[5]),
    })
}

/// Cymru fills unknown columns with `NA`
fn field_value(field: &str) -> Option<String> {
    match field {
        "" | "NA" => None,
        value => Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE_RESPONSE: &str = "Bulk mode; whois.cymru.com [2024-05-01 10:00:00 +0000]\n\
        AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name\n\
        15169 | 8.8.8.8 | 8.8.8.0/24 | US | arin | 2014-03-14 | GOOGLE, US\n";

    #[test]
    fn test_bulk_query() {
        let addresses: Vec<IpAddr> = vec![
            "8.8.8.8".parse().unwrap(),
            "2001:db8::1".parse().unwrap(),
        ];
        assert_eq!(
            bulk_query(&addresses),
            "begin\nverbose\n8.8.8.8\n2001:db8::1\nend\n"
        );
    }

    #[test]
    fn test_parse_google_record() {
        let records = parse_bulk_response(GOOGLE_RESPONSE);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.source, WhoisSource::Cymru);
        assert_eq!(record.ip, "8.8.8.8");
        assert_eq!(record.asn, Some(15169));
        assert_eq!(record.as_name.as_deref(), Some("GOOGLE, US"));
        assert_eq!(record.prefix.as_deref(), Some("8.8.8.0/24"));
        assert_eq!(record.country.as_deref(), Some("US"));
        assert_eq!(record.registry.as_deref(), Some("arin"));
        assert_eq!(record.allocated.as_deref(), Some("2014-03-14"));
    }

    #[test]
    fn test_header_only_yields_nothing() {
        let text = "AS      | IP               | BGP Prefix          | CC | Registry | Allocated  | AS Name\n";
        assert!(parse_bulk_response(text).is_empty());
        assert!(parse_bulk_response("").is_empty());
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let text = "Error: no ASN or IP match on line 1.\n\
                    13335 | 1.1.1.1 | 1.1.1.0/24\n\
                    13335 | 1.1.1.1 | 1.1.1.0/24 | AU | apnic | 2011-08-11 | CLOUDFLARENET, US\n";
        let records = parse_bulk_response(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].asn, Some(13335));
    }

    #[test]
    fn test_non_numeric_asn_is_absent() {
        let text = "NA | 10.0.0.1 | NA | | other | | NA\n";
        let records = parse_bulk_response(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ip, "10.0.0.1");
        assert_eq!(records[0].asn, None);
        assert_eq!(records[0].prefix, None);
        assert_eq!(records[0].as_name, None);
        assert_eq!(records[0].registry.as_deref(), Some("other"));
        assert!(!records[0].is_usable());
    }

    #[test]
    fn test_as_name_keeps_separators() {
        let text = "64500 | 192.0.2.1 | 192.0.2.0/24 | ZZ | ripencc | 2020-01-01 | ODD | NAME, ZZ\n";
        let records = parse_bulk_response(text);
        assert_eq!(records[0].as_name.as_deref(), Some("ODD | NAME, ZZ"));
    }

    #[test]
    fn test_answer_for_matches_echoed_address() {
        let text = "13335 | 1.1.1.1 | 1.1.1.0/24 | AU | apnic | 2011-08-11 | CLOUDFLARENET, US\n\
                    15169 | 8.8.8.8 | 8.8.8.0/24 | US | arin | 2014-03-14 | GOOGLE, US\n";
        let answer = answer_for(text, "8.8.8.8".parse().unwrap()).unwrap();
        assert_eq!(answer.asn, Some(15169));

        // server echoed something else: fall back to the first record
        let answer = answer_for(text, "9.9.9.9".parse().unwrap()).unwrap();
        assert_eq!(answer.asn, Some(13335));

        assert!(answer_for("", "9.9.9.9".parse().unwrap()).is_none());
    }

    #[test]
    fn test_crlf_lines() {
        let text = "AS | IP | BGP Prefix | CC | Registry | Allocated | AS Name\r\n\
                    15169 | 8.8.8.8 | 8.8.8.0/24 | US | arin | 2014-03-14 | GOOGLE, US\r\n";
        let records = parse_bulk_response(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_name.as_deref(), Some("GOOGLE, US"));
    }
}
