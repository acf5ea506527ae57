mod geoip;
mod host;
mod suffix;

use std::net::IpAddr;

pub use geoip::{CidrClassifier, MmdbClassifier, NilClassifier};
pub use host::{classify_host, is_ip_literal, is_private, is_private_ip, parse_ip_literal};
pub use suffix::{resolve_suffix, suffix_candidates, RuleLookup, MAX_SUFFIX_PROBES};

/// Decides whether a resolved address belongs to a network reached directly
pub trait LocalClassifier: Send + Sync {
    /// Whether `ip` should be treated as local (direct)
    fn is_local(&self, ip: IpAddr) -> bool;
}

impl<T: LocalClassifier + ?Sized> LocalClassifier for std::sync::Arc<T> {
    fn is_local(&self, ip: IpAddr) -> bool {
        (**self).is_local(ip)
    }
}
