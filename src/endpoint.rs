use std::fmt;
use std::str::FromStr;

/// Default GELF UDP port used by Graylog inputs.
pub const DEFAULT_PORT: u16 = 12201;

/// Remote collector address, parsed from a `host:port` or
/// `udp://host:port` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint { host: host.into(), port }
    }

    /// Parse an endpoint string and check its scheme.
    ///
    /// Examples:
    /// - "graylog.internal:12201"
    /// - "udp://127.0.0.1:12201"
    /// - "gelf+udp://[::1]:12201"
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();

        let authority = if lower.starts_with("udp://") {
            &s["udp://".len()..]
        } else if lower.starts_with("gelf+udp://") {
            &s["gelf+udp://".len()..]
        } else if lower.contains("://") {
            return Err(EndpointError::UnknownScheme);
        } else {
            s
        };
        let authority = authority.trim_end_matches('/');

        let (host, port) = authority.rsplit_once(':').ok_or(EndpointError::MissingPort)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(EndpointError::MissingHost);
        }
        if port.is_empty() {
            return Err(EndpointError::MissingPort);
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;

        Ok(Endpoint::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form accepted by socket address lookups.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Error type returned when parsing an endpoint.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EndpointError {
    #[error("unknown or unsupported endpoint scheme")]
    UnknownScheme,

    #[error("endpoint has no host")]
    MissingHost,

    #[error("endpoint has no port")]
    MissingPort,

    #[error("invalid port {0:?}")]
    InvalidPort(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_udp_forms() {
        assert_eq!(Endpoint::parse("graylog:12201"), Ok(Endpoint::new("graylog", 12201)));
        assert_eq!(Endpoint::parse("UDP://10.0.0.5:5000/"), Ok(Endpoint::new("10.0.0.5", 5000)));
        assert_eq!(Endpoint::parse("gelf+udp://[::1]:12201"), Ok(Endpoint::new("::1", 12201)));
    }

    #[test]
    fn ipv6_authority_is_bracketed() {
        assert_eq!(Endpoint::new("::1", 12201).authority(), "[::1]:12201");
        assert_eq!(Endpoint::new("localhost", 1).to_string(), "localhost:1");
    }

    #[test]
    fn rejects_bad_endpoints() {
        assert_eq!(Endpoint::parse("tcp://graylog:12201"), Err(EndpointError::UnknownScheme));
        assert_eq!(Endpoint::parse("graylog"), Err(EndpointError::MissingPort));
        assert_eq!(Endpoint::parse("graylog:"), Err(EndpointError::MissingPort));
        assert_eq!(Endpoint::parse(":12201"), Err(EndpointError::MissingHost));
        assert_eq!(
            Endpoint::parse("graylog:99999"),
            Err(EndpointError::InvalidPort("99999".into()))
        );
    }
}
