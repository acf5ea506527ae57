use std::collections::HashMap;

use crate::types::Classification;

/// Maximum number of suffix probes per lookup.
///
/// Hosts with more labels only have their right-most suffixes probed.
pub const MAX_SUFFIX_PROBES: usize = 5;

/// Read access to a host -> classification mapping
pub trait RuleLookup {
    /// Get the classification stored for exactly this key
    fn get_rule(&self, key: &str) -> Option<Classification>;
}

impl RuleLookup for HashMap<String, Classification> {
    fn get_rule(&self, key: &str) -> Option<Classification> {
        self.get(key).copied()
    }
}

/// Candidate suffixes of `host`, most specific first.
///
/// Each candidate is the text following a `.` separator. A trailing `.` is
/// not a separator, and only the last [`MAX_SUFFIX_PROBES`] separators count.
pub fn suffix_candidates(host: &str) -> impl Iterator<Item = &str> + '_ {
    let bytes = host.as_bytes();
    let scan = &bytes[..bytes.len().saturating_sub(1)];
    let dots = scan.iter().filter(|&&b| b == b'.').count();
    let skip = dots.saturating_sub(MAX_SUFFIX_PROBES);

    scan.iter()
        .enumerate()
        .filter(|&(_, &b)| b == b'.')
        .skip(skip)
        .map(move |(i, _)| &host[i + 1..])
}

/// Look up `host` exactly, then by suffix.
///
/// `Some` carries the first hit; `None` means neither the host nor any
/// probed suffix has an entry. IP literals are only ever matched exactly,
/// since their octets are not domain labels.
pub fn resolve_suffix<L>(rules: &L, host: &str, is_ip: bool) -> Option<Classification>
where
    L: RuleLookup + ?Sized,
{
    if let Some(c) = rules.get_rule(host) {
        return Some(c);
    }
    if is_ip {
        return None;
    }
    suffix_candidates(host).find_map(|suffix| rules.get_rule(suffix))
}
