use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use ipnet::IpNet;
use serde::Deserialize;

use super::LocalClassifier;
use crate::error::{GeoErrorKind, RouteError, Result};

/// A single address-family CIDR list sorted by network address, with a
/// precomputed prefix-max broadcast array for efficient early termination.
#[derive(Debug)]
struct SortedCidrList {
    /// CIDRs sorted by network address.
    cidrs: Vec<IpNet>,
    /// `max_broadcast[i]` = max broadcast address of cidrs[0..=i].
    max_broadcast: Vec<IpAddr>,
}

impl SortedCidrList {
    fn from_cidrs(mut cidrs: Vec<IpNet>) -> Self {
        cidrs.sort_by_key(|c| c.network());
        let mut max_broadcast = Vec::with_capacity(cidrs.len());
        let mut current_max: Option<IpAddr> = None;
        for cidr in &cidrs {
            let bcast = cidr.broadcast();
            let new_max = match current_max {
                Some(m) if m >= bcast => m,
                _ => bcast,
            };
            current_max = Some(new_max);
            max_broadcast.push(new_max);
        }
        Self {
            cidrs,
            max_broadcast,
        }
    }

    fn contains(&self, ip: IpAddr) -> bool {
        let idx = self.cidrs.partition_point(|c| c.network() <= ip);

        // If max_broadcast[i] < ip, no CIDR at index <= i can contain ip.
        for i in (0..idx).rev() {
            if self.cidrs[i].contains(&ip) {
                return true;
            }
            if self.max_broadcast[i] < ip {
                break;
            }
        }

        false
    }
}

/// Classifier treating a fixed set of networks as local.
///
/// CIDRs are split by address family and sorted by network address, so a
/// lookup is a binary search plus a short backward scan.
#[derive(Debug)]
pub struct CidrClassifier {
    v4: SortedCidrList,
    v6: SortedCidrList,
}

impl CidrClassifier {
    /// Create a classifier from a list of CIDRs.
    pub fn new(cidrs: Vec<IpNet>) -> Self {
        let (v4, v6): (Vec<IpNet>, Vec<IpNet>) =
            cidrs.into_iter().partition(|c| matches!(c, IpNet::V4(_)));
        Self {
            v4: SortedCidrList::from_cidrs(v4),
            v6: SortedCidrList::from_cidrs(v6),
        }
    }

    /// Parse a CIDR list: one CIDR or bare address per line, `#` starts a comment.
    pub fn parse(text: &str) -> Result<Self> {
        let mut cidrs = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let net = line
                .parse::<IpNet>()
                .or_else(|_| line.parse::<IpAddr>().map(IpNet::from))
                .map_err(|_| RouteError::InvalidCidr {
                    line: idx + 1,
                    value: line.to_string(),
                })?;
            cidrs.push(net);
        }
        Ok(Self::new(cidrs))
    }

    /// Load a CIDR list file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    /// Number of networks held.
    pub fn len(&self) -> usize {
        self.v4.cidrs.len() + self.v6.cidrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalClassifier for CidrClassifier {
    fn is_local(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(_) => self.v4.contains(ip),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => self.v4.contains(IpAddr::V4(v4)),
                None => self.v6.contains(ip),
            },
        }
    }
}

/// Classifier treating addresses located in given countries as local,
/// backed by a MaxMind-format database.
pub struct MmdbClassifier {
    reader: Arc<maxminddb::Reader<Vec<u8>>>,
    countries: Vec<String>,
}

impl MmdbClassifier {
    /// Open an MMDB file; `countries` are ISO codes, matched case-insensitively.
    pub fn open<S: AsRef<str>>(path: impl AsRef<Path>, countries: &[S]) -> Result<Self> {
        let reader = maxminddb::Reader::open_readfile(path.as_ref()).map_err(|e| {
            RouteError::GeoIp {
                kind: GeoErrorKind::FileError,
                message: format!("Failed to open MMDB file: {}", e),
            }
        })?;
        Ok(Self::from_reader(Arc::new(reader), countries))
    }

    /// Create a classifier from a shared reader.
    pub fn from_reader<S: AsRef<str>>(
        reader: Arc<maxminddb::Reader<Vec<u8>>>,
        countries: &[S],
    ) -> Self {
        Self {
            reader,
            countries: countries
                .iter()
                .map(|c| c.as_ref().to_uppercase())
                .collect(),
        }
    }

    /// Look up the country codes recorded for an address.
    ///
    /// Understands MaxMind records, sing-geoip plain strings and Meta-geoip0
    /// string arrays; an array yields every code it holds.
    pub fn country_codes(&self, ip: IpAddr) -> Vec<String> {
        #[derive(Deserialize)]
        struct Country {
            country: Option<CountryInfo>,
        }

        #[derive(Deserialize)]
        struct CountryInfo {
            iso_code: Option<String>,
        }

        let Ok(lookup) = self.reader.lookup(ip) else {
            return Vec::new();
        };

        if let Some(code) = lookup
            .decode::<Country>()
            .ok()
            .flatten()
            .and_then(|r| r.country)
            .and_then(|c| c.iso_code)
        {
            return vec![code];
        }

        if let Some(code) = lookup.decode::<String>().ok().flatten() {
            if !code.is_empty() {
                return vec![code];
            }
        }

        lookup
            .decode::<Vec<String>>()
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// First country code recorded for an address.
    pub fn country(&self, ip: IpAddr) -> Option<String> {
        self.country_codes(ip).into_iter().next()
    }
}

/// Whether any of `codes` is one of the `countries`, ignoring case.
fn any_country_matches<S: AsRef<str>>(countries: &[String], codes: &[S]) -> bool {
    codes
        .iter()
        .any(|code| countries.iter().any(|c| c.eq_ignore_ascii_case(code.as_ref())))
}

impl LocalClassifier for MmdbClassifier {
    fn is_local(&self, ip: IpAddr) -> bool {
        any_country_matches(&self.countries, self.country_codes(ip).as_slice())
    }
}

impl std::fmt::Debug for MmdbClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmdbClassifier")
            .field("countries", &self.countries)
            .finish_non_exhaustive()
    }
}

/// Classifier that never treats an address as local.
#[derive(Debug, Clone, Copy, Default)]
pub struct NilClassifier;

impl LocalClassifier for NilClassifier {
    fn is_local(&self, _ip: IpAddr) -> bool {
        false
    }
}
