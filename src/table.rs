//! Shared host -> classification table.

use std::borrow::Cow;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::matcher::{resolve_suffix, RuleLookup};
use crate::types::Classification;

/// Lowercase a key, only allocating when uppercase bytes are present.
pub(crate) fn normalize_key(key: &str) -> Cow<'_, str> {
    if key.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(key.to_ascii_lowercase())
    } else {
        Cow::Borrowed(key)
    }
}

/// Host and domain rules, read on every connection and written on learning.
///
/// Keys are ASCII-lowercased on insert and lookup. Only `Direct`, `Forward`
/// and `Reject` are ever stored. The lock is never held across I/O: callers
/// resolve and classify first, then write.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: RwLock<HashMap<String, Classification>>,
}

impl RuleTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key exactly.
    pub fn lookup(&self, key: &str) -> Option<Classification> {
        let key = normalize_key(key);
        self.rules.read().get(key.as_ref()).copied()
    }

    /// Look up a host exactly and then by suffix, under a single read lock.
    pub fn resolve(&self, host: &str, is_ip: bool) -> Option<Classification> {
        let host = normalize_key(host);
        let rules = self.rules.read();
        resolve_suffix(&*rules, &host, is_ip)
    }

    /// Store a single entry. `Unknown` is never stored.
    pub fn set(&self, key: &str, classification: Classification) {
        if !classification.is_known() {
            tracing::warn!(key = %key, "refusing to store unknown classification");
            return;
        }
        let key = normalize_key(key).into_owned();
        self.rules.write().insert(key, classification);
    }

    /// Store many entries under one write lock. Returns the number written.
    pub fn set_many<I, S>(&self, keys: I, classification: Classification) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !classification.is_known() {
            tracing::warn!("refusing to store unknown classification");
            return 0;
        }
        let mut rules = self.rules.write();
        let mut count = 0;
        for key in keys {
            rules.insert(normalize_key(key.as_ref()).into_owned(), classification);
            count += 1;
        }
        count
    }

    /// Snapshot of every key classified `Direct`, in no particular order.
    pub fn export_direct(&self) -> Vec<String> {
        self.rules
            .read()
            .iter()
            .filter(|(_, c)| **c == Classification::Direct)
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Whether an exact entry exists for this key.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

impl RuleLookup for RuleTable {
    fn get_rule(&self, key: &str) -> Option<Classification> {
        self.lookup(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_miss_is_distinct_from_entry() {
        let table = RuleTable::new();
        assert_eq!(table.lookup("example.com"), None);

        table.set("example.com", Classification::Forward);
        assert_eq!(table.lookup("example.com"), Some(Classification::Forward));
    }

    #[test]
    fn test_unknown_is_never_stored() {
        let table = RuleTable::new();
        table.set("example.com", Classification::Unknown);
        assert!(table.is_empty());
        assert_eq!(table.set_many(["a.com", "b.com"], Classification::Unknown), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let table = RuleTable::new();
        table.set("Example.COM", Classification::Reject);
        assert_eq!(table.lookup("example.com"), Some(Classification::Reject));
        assert_eq!(table.lookup("EXAMPLE.com"), Some(Classification::Reject));
        assert_eq!(
            table.resolve("WWW.Example.Com", false),
            Some(Classification::Reject)
        );
    }

    #[test]
    fn test_set_overwrites() {
        let table = RuleTable::new();
        table.set("example.com", Classification::Direct);
        table.set("example.com", Classification::Reject);
        assert_eq!(table.lookup("example.com"), Some(Classification::Reject));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_set_many() {
        let table = RuleTable::new();
        let n = table.set_many(vec!["a.com", "b.com", "c.com"], Classification::Direct);
        assert_eq!(n, 3);
        assert_eq!(table.len(), 3);
        assert!(table.contains("b.com"));
    }

    #[test]
    fn test_resolve_uses_suffix_rules() {
        let table = RuleTable::new();
        table.set("example.com", Classification::Direct);
        assert_eq!(
            table.resolve("a.b.example.com", false),
            Some(Classification::Direct)
        );
        assert_eq!(table.resolve("example.org", false), None);
    }

    #[test]
    fn test_export_direct_only() {
        let table = RuleTable::new();
        table.set_many(["a.com", "b.com"], Classification::Direct);
        table.set("c.com", Classification::Forward);
        table.set("d.com", Classification::Reject);

        let mut direct = table.export_direct();
        direct.sort();
        assert_eq!(direct, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_concurrent_readers_and_writers() {
        let table = Arc::new(RuleTable::new());
        table.set("example.com", Classification::Direct);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = table.clone();
                thread::spawn(move || {
                    for j in 0..200 {
                        assert_eq!(
                            table.resolve("www.example.com", false),
                            Some(Classification::Direct)
                        );
                        table.set(&format!("h{}-{}.net", i, j), Classification::Forward);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), 1 + 8 * 200);
    }
}
