use std::net::IpAddr;

use ipnet::IpNet;
use once_cell::sync::Lazy;

use crate::types::HostKind;

/// Address ranges that never benefit from an upstream proxy.
static PRIVATE_RANGES: Lazy<Vec<IpNet>> = Lazy::new(|| {
    [
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "::1/128",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .map(|s| s.parse().expect("PRIVATE_RANGES: hardcoded CIDR is invalid"))
    .collect()
});

/// Parse a host as an IP literal, accepting bracketed IPv6 (`[::1]`).
pub fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let trimmed = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    trimmed.parse().ok()
}

/// Whether the address falls in a loopback, private, shared, link-local or unique-local range.
pub fn is_private_ip(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    };
    PRIVATE_RANGES.iter().any(|net| net.contains(&ip))
}

/// Classify a host string as a name, a public IP literal or a private IP literal.
pub fn classify_host(host: &str) -> HostKind {
    match parse_ip_literal(host) {
        Some(ip) if is_private_ip(ip) => HostKind::PrivateIp(ip),
        Some(ip) => HostKind::PublicIp(ip),
        None => HostKind::Name,
    }
}

/// Whether the host is an IP literal.
pub fn is_ip_literal(host: &str) -> bool {
    parse_ip_literal(host).is_some()
}

/// Whether the host is a private-range IP literal.
pub fn is_private(host: &str) -> bool {
    classify_host(host).is_private()
}
