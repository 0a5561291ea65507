//! RADb route-object dialect
//!
//! A query for an address returns every route object covering it, as RPSL
//! attribute blocks separated by blank lines:
//!
//! ```text
//! route:          8.8.8.0/24
//! descr:          Google
//! origin:         AS15169
//! source:         RADB
//!
//! route:          8.8.0.0/16
//! origin:         AS15169
//! ```

use super::types::{SourceAnswer, WhoisSource};
use ipnet::IpNet;
use serde::Serialize;
use std::net::IpAddr;

/// A `route`/`route6` object reduced to the two attributes we need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteObject {
    pub prefix: IpNet,
    pub origin: u32,
}

/// Build a route query for one address
pub fn route_query(address: IpAddr) -> String {
    format!("{}\n", address)
}

/// Extract every complete route object from a response
///
/// A block contributes only when it has both a parseable `route`/`route6`
/// prefix and an `origin`. Host bits in the prefix are masked off.
pub fn parse_route_objects(text: &str) -> Vec<RouteObject> {
    let mut routes = Vec::new();
    let mut block = Block::default();

    for line in text.lines() {
        if line.trim().is_empty() {
            routes.extend(block.finish());
            block = Block::default();
            continue;
        }
        block.push(line);
    }
    routes.extend(block.finish());

    routes
}

/// The most specific route covering `address`
///
/// Equal prefix lengths keep the object that appeared first.
pub fn most_specific(routes: &[RouteObject], address: IpAddr) -> Option<&RouteObject> {
    let mut best: Option<&RouteObject> = None;
    for route in routes.iter().filter(|r| r.prefix.contains(&address)) {
        match best {
            Some(current) if route.prefix.prefix_len() <= current.prefix.prefix_len() => {}
            _ => best = Some(route),
        }
    }
    best
}

/// The answer for `address`: its most specific covering route
pub fn answer_for(text: &str, address: IpAddr) -> Option<SourceAnswer> {
    let routes = parse_route_objects(text);
    most_specific(&routes, address).map(|route| SourceAnswer {
        source: WhoisSource::Radb,
        ip: address.to_string(),
        asn: Some(route.origin),
        as_name: None,
        prefix: Some(route.prefix.to_string()),
        country: None,
        registry: None,
        allocated: None,
    })
}

#[derive(Default)]
struct Block {
    route: Option<String>,
    origin: Option<String>,
}

impl Block {
    fn push(&mut self, line: &str) {
        let Some((key, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "route" | "route6" => self.route = Some(value.to_string()),
            "origin" => self.origin = Some(value.to_string()),
            _ => {}
        }
    }

    fn finish(&self) -> Option<RouteObject> {
        let prefix = parse_prefix(self.route.as_deref()?)?;
        let origin = parse_origin(self.origin.as_deref()?)?;
        Some(RouteObject { prefix, origin })
    }
}

fn parse_prefix(value: &str) -> Option<IpNet> {
    let literal = value.split_whitespace().next()?;
    literal.parse::<IpNet>().ok().map(|net| net.trunc())
}

/// `AS15169` -> 15169
fn parse_origin(value: &str) -> Option<u32> {
    let token = value.split_whitespace().next()?;
    let digits = token.get(..2).filter(|p| p.eq_ignore_ascii_case("AS"))?;
    token[digits.len()..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE_ROUTES: &str = "route:          8.8.0.0/16\n\
        descr:          Google\n\
        origin:         AS15169\n\
        source:         RADB\n\
        \n\
        route:          8.8.8.0/24\n\
        descr:          Google\n\
        origin:         AS15169\n\
        mnt-by:         MAINT-AS15169\n\
        source:         RADB\n";

    #[test]
    fn test_parse_route_objects() {
        let routes = parse_route_objects(GOOGLE_ROUTES);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].prefix.to_string(), "8.8.0.0/16");
        assert_eq!(routes[1].prefix.to_string(), "8.8.8.0/24");
        assert!(routes.iter().all(|r| r.origin == 15169));
    }

    #[test]
    fn test_most_specific_prefix_wins() {
        let answer = answer_for(GOOGLE_ROUTES, "8.8.8.8".parse().unwrap()).unwrap();
        assert_eq!(answer.source, WhoisSource::Radb);
        assert_eq!(answer.asn, Some(15169));
        assert_eq!(answer.prefix.as_deref(), Some("8.8.8.0/24"));
        assert_eq!(answer.as_name, None);
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let text = "route: 192.0.2.0/24\norigin: AS64500\n\nroute: 192.0.2.0/24\norigin: AS64501\n";
        let routes = parse_route_objects(text);
        let best = most_specific(&routes, "192.0.2.10".parse().unwrap()).unwrap();
        assert_eq!(best.origin, 64500);
    }

    #[test]
    fn test_incomplete_blocks_are_ignored() {
        let text = "route: 1.1.1.0/24\ndescr: no origin here\n\n\
                    origin: AS13335\ndescr: no route here\n\n\
                    route: not-a-prefix\norigin: AS13335\n\n\
                    route: 1.0.0.0/8\norigin: 13335\n";
        assert!(parse_route_objects(text).is_empty());
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let text = "Route: 1.1.1.0/24\nORIGIN: as13335\n";
        let routes = parse_route_objects(text);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].origin, 13335);
    }

    #[test]
    fn test_route6_and_host_bits() {
        let text = "route6: 2606:4700::1/32\norigin: AS13335\n\n\
                    route: 1.1.1.1/24\norigin: AS13335\n";
        let routes = parse_route_objects(text);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].prefix.to_string(), "2606:4700::/32");
        assert_eq!(routes[1].prefix.to_string(), "1.1.1.0/24");

        let answer = answer_for(text, "2606:4700:4700::1111".parse().unwrap()).unwrap();
        assert_eq!(answer.prefix.as_deref(), Some("2606:4700::/32"));
    }

    #[test]
    fn test_routes_not_covering_address_are_skipped() {
        let text = "route: 203.0.113.0/24\norigin: AS64500\n";
        assert!(answer_for(text, "8.8.8.8".parse().unwrap()).is_none());
    }

    #[test]
    fn test_comments_and_crlf() {
        let text = "% This is the RADb whois server.\r\n\r\nroute: 1.1.1.0/24\r\norigin: AS13335\r\n\r\n";
        let routes = parse_route_objects(text);
        assert_eq!(routes.len(), 1);
        assert_eq!(route_query("1.1.1.1".parse().unwrap()), "1.1.1.1\n");
    }
}
