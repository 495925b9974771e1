//! Endpoint parser module for turning batch input into probe targets

use crate::proxy::models::{Endpoint, EndpointSpec};

/// Endpoint parser for batch items and input files
pub struct EndpointParser;

impl EndpointParser {
    /// Parse a single `host:port` address string
    pub fn parse_addr(addr: &str) -> Option<Endpoint> {
        let addr = addr.trim();
        let (host, port) = addr.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        let port: u16 = port.parse().ok()?;
        Some(Endpoint::new(host.to_string(), port))
    }

    /// Parse a batch item into a probe target
    pub fn parse_spec(spec: &EndpointSpec) -> Option<Endpoint> {
        match spec {
            EndpointSpec::Addr(addr) => Self::parse_addr(addr),
            EndpointSpec::Detailed {
                ip,
                port,
                country,
                isp,
            } => {
                if ip.trim().is_empty() {
                    return None;
                }
                Some(Endpoint {
                    host: ip.trim().to_string(),
                    port: *port,
                    country_hint: country.clone().filter(|c| !c.is_empty()),
                    isp_hint: isp.clone().filter(|i| !i.is_empty()),
                })
            }
        }
    }

    /// Parse input file content into batch items, one per line.
    ///
    /// Lines starting with `{` are parsed as JSON specs (with hint fields);
    /// anything else is taken as a `host:port` address. Empty lines and
    /// `#` comments are skipped. Malformed JSON lines are kept as address
    /// items so they surface as per-item errors instead of vanishing.
    pub fn parse_input(content: &str) -> Vec<EndpointSpec> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                if line.starts_with('{') {
                    serde_json::from_str(line)
                        .unwrap_or_else(|_| EndpointSpec::Addr(line.to_string()))
                } else {
                    EndpointSpec::Addr(line.to_string())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        let endpoint = EndpointParser::parse_addr("192.168.1.1:8080").unwrap();
        assert_eq!(endpoint.host, "192.168.1.1");
        assert_eq!(endpoint.port, 8080);
        assert!(endpoint.country_hint.is_none());
        assert!(endpoint.isp_hint.is_none());
    }

    #[test]
    fn test_parse_addr_trims_whitespace() {
        let endpoint = EndpointParser::parse_addr("  1.2.3.4:80  ").unwrap();
        assert_eq!(endpoint.key(), "1.2.3.4:80");
    }

    #[test]
    fn test_parse_addr_invalid() {
        assert!(EndpointParser::parse_addr("").is_none());
        assert!(EndpointParser::parse_addr("1.2.3.4").is_none());
        assert!(EndpointParser::parse_addr("1.2.3.4:abc").is_none());
        assert!(EndpointParser::parse_addr("1.2.3.4:99999").is_none());
        assert!(EndpointParser::parse_addr(":8080").is_none());
    }

    #[test]
    fn test_parse_spec_addr() {
        let spec = EndpointSpec::Addr("1.2.3.4:8080".to_string());
        let endpoint = EndpointParser::parse_spec(&spec).unwrap();
        assert_eq!(endpoint.key(), "1.2.3.4:8080");
    }

    #[test]
    fn test_parse_spec_detailed_with_hints() {
        let spec = EndpointSpec::Detailed {
            ip: "10.0.0.1".to_string(),
            port: 9999,
            country: Some("de".to_string()),
            isp: Some("ExampleISP".to_string()),
        };
        let endpoint = EndpointParser::parse_spec(&spec).unwrap();
        assert_eq!(endpoint.key(), "10.0.0.1:9999");
        assert_eq!(endpoint.country_hint.as_deref(), Some("de"));
        assert_eq!(endpoint.isp_hint.as_deref(), Some("ExampleISP"));
    }

    #[test]
    fn test_parse_spec_detailed_empty_ip() {
        let spec = EndpointSpec::Detailed {
            ip: "  ".to_string(),
            port: 80,
            country: None,
            isp: None,
        };
        assert!(EndpointParser::parse_spec(&spec).is_none());
    }

    #[test]
    fn test_parse_input() {
        let content = r#"
1.2.3.4:8080
# a comment
{"ip":"10.0.0.1","port":9999,"country":"de"}

5.6.7.8:3128
"#;
        let specs = EndpointParser::parse_input(content);
        assert_eq!(specs.len(), 3);
        assert!(matches!(&specs[0], EndpointSpec::Addr(s) if s == "1.2.3.4:8080"));
        assert!(matches!(&specs[1], EndpointSpec::Detailed { port: 9999, .. }));
        assert!(matches!(&specs[2], EndpointSpec::Addr(s) if s == "5.6.7.8:3128"));
    }
}
