//! Route Judge - direct / forward / reject decisions for forwarding proxies
//!
//! For every destination host a proxy connects to, this library decides
//! whether the connection goes out directly, through the configured upstream
//! (parent) proxy, or is refused:
//! - Exact host and domain-subtree rules loaded from plain-text lists
//! - Bounded suffix search (at most 5 suffix probes per host)
//! - Upstream-aware policy: without an upstream only `Reject` survives
//! - Judging unknown hosts by address (DNS + CIDR / GeoIP), remembering the verdict
//!
//! # Example
//!
//! ```rust
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//! use route_judge::{
//!     CidrClassifier, Classification, Destination, Router, RouterOptions, RuleTable,
//!     StaticResolver,
//! };
//!
//! let table = Arc::new(RuleTable::new());
//! table.set("example.com", Classification::Direct);
//! table.set("ads.example.net", Classification::Reject);
//!
//! let local = CidrClassifier::new(vec!["114.114.0.0/16".parse().unwrap()]);
//! let resolver = StaticResolver::new()
//!     .with_mapping("cdn.example.org", IpAddr::V4(Ipv4Addr::new(114, 114, 114, 114)));
//!
//! let router = Router::new(table, Arc::new(true), Arc::new(local), RouterOptions::new())
//!     .with_resolver(Arc::new(resolver));
//!
//! // Subtree rule
//! let dest = Destination::from_host("www.example.com");
//! assert_eq!(router.classify(&dest), Classification::Direct);
//!
//! // Explicit reject
//! let dest = Destination::from_host("ads.example.net");
//! assert_eq!(router.classify(&dest), Classification::Reject);
//!
//! // Judged by address, then remembered
//! let dest = Destination::from_host("cdn.example.org");
//! assert_eq!(router.classify(&dest), Classification::Direct);
//! assert!(router.table().contains("cdn.example.org"));
//! ```
//!
//! # Rule Lists
//!
//! One host or domain per line. An entry applies to that host and to every
//! subdomain of it; the most specific entry wins.
//!
//! ```text
//! example.com
//! ads.example.net
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod matcher;
pub mod resolver;
pub mod router;
pub mod table;
pub mod types;

// Re-export commonly used items
pub use config::RouteConfig;
pub use error::{GeoErrorKind, ResolveErrorKind, Result, RouteError};
pub use loader::{load_rules, load_rules_from_reader, try_load_rules};
pub use matcher::{
    classify_host, resolve_suffix, suffix_candidates, CidrClassifier, LocalClassifier,
    MmdbClassifier, NilClassifier, RuleLookup, MAX_SUFFIX_PROBES,
};
pub use table::RuleTable;
pub use types::{Classification, Destination, HostKind};

// Re-export resolver types
#[cfg(feature = "async")]
pub use resolver::AsyncResolver;
pub use resolver::{NilResolver, Resolver, StaticResolver, SystemResolver};

// Re-export router types
pub use router::{Router, RouterOptions, UpstreamPresence, DEFAULT_RESOLVE_TIMEOUT};
