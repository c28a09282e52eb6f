use anyhow::{Context, Result, anyhow, bail};
use std::{fmt, str::FromStr};

/// Port used when a host entry does not specify one
pub const DEFAULT_PORT: u16 = 443;

/// A TLS endpoint to probe
///
/// The `host:port` identity returned by [`Endpoint::id`] is used both as the
/// store key and as the `connect_host` label value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Endpoint identity, IPv6 literals are wrapped in brackets
    #[must_use]
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = anyhow::Error;

    fn from_str(entry: &str) -> Result<Self> {
        let (host, port) = if let Some(rest) = entry.strip_prefix('[') {
            let (host, after) = rest
                .split_once(']')
                .ok_or_else(|| anyhow!("missing closing bracket in host entry: {entry}"))?;
            let port = match after {
                "" => None,
                _ => Some(
                    after
                        .strip_prefix(':')
                        .ok_or_else(|| anyhow!("unexpected characters after ']' in: {entry}"))?,
                ),
            };
            (host, port)
        } else if entry.matches(':').count() > 1 {
            // bare IPv6 literal, no port
            (entry, None)
        } else {
            match entry.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (entry, None),
            }
        };

        if host.is_empty() {
            bail!("empty host in entry: {entry}");
        }

        let port = match port {
            Some(port) => {
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("invalid port in host entry: {entry}"))?;
                if port == 0 {
                    bail!("invalid port in host entry: {entry}");
                }
                port
            }
            None => DEFAULT_PORT,
        };

        Ok(Self::new(host, port))
    }
}

/// Parse a comma separated list of `host[:port]` entries
///
/// Whitespace is removed before splitting, empty entries are skipped and
/// repeated endpoints are kept once, in first-seen order.
///
/// # Errors
///
/// Returns an error if an entry is malformed or the list yields no endpoints
pub fn parse_hosts(list: &str) -> Result<Vec<Endpoint>> {
    let compact: String = list.chars().filter(|c| !c.is_whitespace()).collect();

    let mut endpoints: Vec<Endpoint> = Vec::new();
    for entry in compact.split(',').filter(|entry| !entry.is_empty()) {
        let endpoint = entry.parse::<Endpoint>()?;
        if !endpoints.contains(&endpoint) {
            endpoints.push(endpoint);
        }
    }

    if endpoints.is_empty() {
        bail!("no hosts to check have been configured");
    }

    Ok(endpoints)
}
