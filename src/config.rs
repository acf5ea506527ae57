//! Routing configuration.
//!
//! Parsed from JSON, for example:
//!
//! ```json
//! {
//!   "judge_by_ip": true,
//!   "direct_file": "/etc/proxy/direct",
//!   "proxy_file": "/etc/proxy/proxy",
//!   "reject_file": "/etc/proxy/reject",
//!   "local_cidr_file": "/etc/proxy/local-cidrs",
//!   "resolve_timeout_ms": 3000
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RouteError};
use crate::loader::load_rules;
use crate::matcher::{CidrClassifier, LocalClassifier, MmdbClassifier, NilClassifier};
use crate::router::{RouterOptions, DEFAULT_RESOLVE_TIMEOUT};
use crate::table::RuleTable;
use crate::types::Classification;

fn default_true() -> bool {
    true
}

fn default_resolve_timeout_ms() -> u64 {
    DEFAULT_RESOLVE_TIMEOUT.as_millis() as u64
}

/// Routing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteConfig {
    /// Resolve hosts no rule matches and classify them by address
    #[serde(default = "default_true")]
    pub judge_by_ip: bool,
    /// Hosts and domains to connect to directly
    pub direct_file: Option<PathBuf>,
    /// Hosts and domains to send through the upstream proxy
    pub proxy_file: Option<PathBuf>,
    /// Hosts and domains to refuse
    pub reject_file: Option<PathBuf>,
    /// Networks treated as local when judging by address
    pub local_cidr_file: Option<PathBuf>,
    /// MaxMind database used when no CIDR file is given
    pub geoip_mmdb: Option<PathBuf>,
    /// ISO country codes treated as local with `geoip_mmdb`
    pub local_countries: Vec<String>,
    /// DNS timeout for async classification, in milliseconds
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            judge_by_ip: true,
            direct_file: None,
            proxy_file: None,
            reject_file: None,
            local_cidr_file: None,
            geoip_mmdb: None,
            local_countries: Vec::new(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}

impl RouteConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.resolve_timeout_ms == 0 {
            return Err(RouteError::Config(
                "resolve_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.geoip_mmdb.is_some() && self.local_countries.is_empty() {
            return Err(RouteError::Config(
                "geoip_mmdb requires at least one entry in local_countries".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured rule files in load order: direct, proxy, reject.
    ///
    /// Later files override earlier ones for duplicate entries.
    pub fn rule_files(&self) -> Vec<(&Path, Classification)> {
        [
            (&self.direct_file, Classification::Direct),
            (&self.proxy_file, Classification::Forward),
            (&self.reject_file, Classification::Reject),
        ]
        .into_iter()
        .filter_map(|(path, c)| path.as_deref().map(|p| (p, c)))
        .collect()
    }

    /// Load every configured rule file into the table.
    ///
    /// Missing or unreadable files are skipped (and logged); returns the
    /// number of entries installed.
    pub fn load_rule_files(&self, table: &RuleTable) -> usize {
        self.rule_files()
            .into_iter()
            .map(|(path, c)| load_rules(table, path, c))
            .sum()
    }

    /// Build the address classifier: the CIDR file if set, else the MMDB
    /// database, else one that never treats an address as local.
    pub fn local_classifier(&self) -> Result<Arc<dyn LocalClassifier>> {
        if let Some(path) = &self.local_cidr_file {
            let classifier = CidrClassifier::from_file(path)?;
            debug!(path = %path.display(), networks = classifier.len(), "loaded local networks");
            return Ok(Arc::new(classifier));
        }
        if let Some(path) = &self.geoip_mmdb {
            return Ok(Arc::new(MmdbClassifier::open(path, self.local_countries.as_slice())?));
        }
        Ok(Arc::new(NilClassifier))
    }

    /// Router options derived from this configuration.
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions::new()
            .with_judge_by_ip(self.judge_by_ip)
            .with_resolve_timeout(Duration::from_millis(self.resolve_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::IpAddr;

    use super::*;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = RouteConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RouteConfig::default());
        assert!(config.judge_by_ip);
        assert_eq!(config.resolve_timeout_ms, 5000);
        assert!(config.rule_files().is_empty());
    }

    #[test]
    fn test_parse_full() {
        let config = RouteConfig::from_json_str(
            r#"{
                "judge_by_ip": false,
                "direct_file": "/etc/proxy/direct",
                "reject_file": "/etc/proxy/reject",
                "resolve_timeout_ms": 1500
            }"#,
        )
        .unwrap();

        assert!(!config.judge_by_ip);
        assert_eq!(
            config.rule_files(),
            vec![
                (Path::new("/etc/proxy/direct"), Classification::Direct),
                (Path::new("/etc/proxy/reject"), Classification::Reject),
            ]
        );

        let options = config.router_options();
        assert!(!options.judge_by_ip);
        assert_eq!(options.resolve_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RouteConfig::from_json_str(r#"{"judge_by_dns": true}"#).unwrap_err();
        assert!(matches!(err, RouteError::ConfigParse(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = RouteConfig::from_json_str(r#"{"resolve_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, RouteError::Config(_)));
    }

    #[test]
    fn test_mmdb_requires_countries() {
        let err = RouteConfig::from_json_str(r#"{"geoip_mmdb": "/x.mmdb"}"#).unwrap_err();
        assert!(matches!(err, RouteError::Config(_)));
    }

    #[test]
    fn test_load_rule_files_reject_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = RouteConfig {
            direct_file: Some(write_file(dir.path(), "direct", "example.com\nboth.net\n")),
            proxy_file: Some(write_file(dir.path(), "proxy", "blocked.org\n")),
            reject_file: Some(write_file(dir.path(), "reject", "both.net\n")),
            ..RouteConfig::default()
        };

        let table = RuleTable::new();
        assert_eq!(config.load_rule_files(&table), 4);
        assert_eq!(table.lookup("example.com"), Some(Classification::Direct));
        assert_eq!(table.lookup("blocked.org"), Some(Classification::Forward));
        assert_eq!(table.lookup("both.net"), Some(Classification::Reject));
    }

    #[test]
    fn test_missing_rule_files_are_skipped() {
        let config = RouteConfig {
            direct_file: Some(PathBuf::from("/nonexistent/direct")),
            ..RouteConfig::default()
        };
        let table = RuleTable::new();
        assert_eq!(config.load_rule_files(&table), 0);
    }

    #[test]
    fn test_local_classifier_from_cidr_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = RouteConfig {
            local_cidr_file: Some(write_file(dir.path(), "cidrs", "114.114.0.0/16\n")),
            ..RouteConfig::default()
        };
        let classifier = config.local_classifier().unwrap();
        assert!(classifier.is_local("114.114.114.114".parse::<IpAddr>().unwrap()));
        assert!(!classifier.is_local("8.8.8.8".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_local_classifier_defaults_to_nil() {
        let classifier = RouteConfig::default().local_classifier().unwrap();
        assert!(!classifier.is_local("114.114.114.114".parse::<IpAddr>().unwrap()));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "route.json", r#"{"judge_by_ip": false}"#);
        let config = RouteConfig::from_file(&path).unwrap();
        assert!(!config.judge_by_ip);
    }
}
