use std::fmt;
use std::net::IpAddr;

use crate::matcher::classify_host;

/// Routing classification of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Classification {
    /// Not yet classified. Never stored in a rule table and never returned by the router.
    #[default]
    Unknown,
    /// Connect from the local network, bypassing any upstream proxy
    Direct,
    /// Send through the upstream (parent) proxy
    Forward,
    /// Refuse the connection
    Reject,
}

impl Classification {
    /// Whether this is a definite verdict (anything but `Unknown`).
    pub fn is_known(&self) -> bool {
        !matches!(self, Classification::Unknown)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Unknown => "unknown",
            Classification::Direct => "direct",
            Classification::Forward => "forward",
            Classification::Reject => "reject",
        };
        f.write_str(s)
    }
}

/// What a host string is, as far as routing cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    /// A host name (not an IP literal)
    Name,
    /// A public IP literal
    PublicIp(IpAddr),
    /// A loopback, private, link-local or unique-local IP literal
    PrivateIp(IpAddr),
}

impl HostKind {
    /// Whether the host is an IP literal of any kind.
    pub fn is_ip(&self) -> bool {
        !matches!(self, HostKind::Name)
    }

    /// Whether the host is a private-range IP literal.
    pub fn is_private(&self) -> bool {
        matches!(self, HostKind::PrivateIp(_))
    }
}

/// Connection destination to classify
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    /// Textual host, possibly an IP literal
    pub host: String,
    /// Empty when the host is a bare name or a private-range literal
    pub domain: String,
}

impl Destination {
    /// Create a destination with an explicit domain.
    pub fn new(host: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            domain: domain.into(),
        }
    }

    /// Create a destination from a host, deriving the domain field.
    ///
    /// Bare names (no dot) and private-range literals get an empty domain,
    /// everything else uses the host itself.
    pub fn from_host(host: impl Into<String>) -> Self {
        let host = host.into();
        let domain = match classify_host(&host) {
            HostKind::PrivateIp(_) => String::new(),
            HostKind::PublicIp(_) => host.clone(),
            HostKind::Name if !host.trim_end_matches('.').contains('.') => String::new(),
            HostKind::Name => host.clone(),
        };
        Self { host, domain }
    }
}
