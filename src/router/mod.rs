//! Router module.
//!
//! Decides whether a destination goes out directly, through the upstream
//! proxy, or is rejected, and remembers what it learns by resolving hosts.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::matcher::{classify_host, LocalClassifier};
use crate::resolver::{Resolver, SystemResolver};
use crate::table::RuleTable;
use crate::types::{Classification, Destination, HostKind};

#[cfg(feature = "async")]
use crate::error::{ResolveErrorKind, RouteError};
#[cfg(feature = "async")]
use crate::resolver::AsyncResolver;

/// Default DNS timeout for async classification
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tells the router whether any upstream (parent) proxy is configured.
pub trait UpstreamPresence: Send + Sync {
    fn has_upstream(&self) -> bool;
}

impl UpstreamPresence for bool {
    fn has_upstream(&self) -> bool {
        *self
    }
}

impl UpstreamPresence for AtomicBool {
    fn has_upstream(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// Router options.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Resolve unmatched hosts and classify them by address
    pub judge_by_ip: bool,
    /// Timeout applied to DNS lookups on the async path
    pub resolve_timeout: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            judge_by_ip: true,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl RouterOptions {
    /// Create new router options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable judging unmatched hosts by address.
    pub fn with_judge_by_ip(mut self, judge_by_ip: bool) -> Self {
        self.judge_by_ip = judge_by_ip;
        self
    }

    /// Set the async DNS timeout.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }
}

/// Outcome of the table stage of a classification.
enum Pending {
    /// Final verdict, no I/O needed
    Done(Classification),
    /// Classify this literal address
    Judge(IpAddr),
    /// Resolve the host first
    Resolve,
}

/// Routing decision engine.
///
/// Table lookups happen under the table's read lock. DNS and address
/// classification run with no lock held; only the learned entry is written
/// afterwards. Concurrent first lookups of the same host each resolve it and
/// write the same verdict.
pub struct Router {
    table: Arc<RuleTable>,
    upstream: Arc<dyn UpstreamPresence>,
    classifier: Arc<dyn LocalClassifier>,
    resolver: Arc<dyn Resolver>,
    #[cfg(feature = "async")]
    async_resolver: Arc<dyn AsyncResolver>,
    options: RouterOptions,
}

impl Router {
    /// Create a router using the system resolver.
    pub fn new(
        table: Arc<RuleTable>,
        upstream: Arc<dyn UpstreamPresence>,
        classifier: Arc<dyn LocalClassifier>,
        options: RouterOptions,
    ) -> Self {
        Self {
            table,
            upstream,
            classifier,
            resolver: Arc::new(SystemResolver::new()),
            #[cfg(feature = "async")]
            async_resolver: Arc::new(SystemResolver::new()),
            options,
        }
    }

    /// Replace the resolver used by [`Router::classify`].
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the resolver used by [`Router::classify_async`].
    #[cfg(feature = "async")]
    pub fn with_async_resolver(mut self, resolver: Arc<dyn AsyncResolver>) -> Self {
        self.async_resolver = resolver;
        self
    }

    /// The table this router reads and learns into.
    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Load a rule file into the table, tagging every entry with `classification`.
    pub fn load_rules(
        &self,
        path: impl AsRef<std::path::Path>,
        classification: Classification,
    ) -> usize {
        crate::loader::load_rules(&self.table, path, classification)
    }

    /// Hosts currently classified `Direct`, in no particular order.
    pub fn export_direct_hosts(&self) -> Vec<String> {
        self.table.export_direct()
    }

    /// Classify a destination, resolving it with the blocking resolver if needed.
    ///
    /// Always yields `Direct`, `Forward` or `Reject`.
    pub fn classify(&self, dest: &Destination) -> Classification {
        match self.judge_from_table(dest) {
            Pending::Done(c) => c,
            Pending::Judge(ip) => self.learn(&dest.host, ip),
            Pending::Resolve => {
                let resolved = self.resolver.resolve(&dest.host);
                self.finish_resolve(&dest.host, resolved)
            }
        }
    }

    /// Classify a destination, resolving it with the async resolver if needed.
    ///
    /// The lookup is bounded by [`RouterOptions::resolve_timeout`]; a timeout
    /// counts as a failed lookup.
    #[cfg(feature = "async")]
    pub async fn classify_async(&self, dest: &Destination) -> Classification {
        match self.judge_from_table(dest) {
            Pending::Done(c) => c,
            Pending::Judge(ip) => self.learn(&dest.host, ip),
            Pending::Resolve => {
                let lookup = self.async_resolver.resolve(&dest.host);
                let timeout = self.options.resolve_timeout;
                let resolved = match tokio::time::timeout(timeout, lookup).await {
                    Ok(resolved) => resolved,
                    Err(_) => Err(RouteError::resolve(
                        ResolveErrorKind::Timeout,
                        format!("Resolving {} timed out after {:?}", dest.host, timeout),
                    )),
                };
                self.finish_resolve(&dest.host, resolved)
            }
        }
    }

    /// Everything up to the first blocking call.
    fn judge_from_table(&self, dest: &Destination) -> Pending {
        debug!(host = %dest.host, "judging host");

        if dest.domain.is_empty() {
            return Pending::Done(Classification::Direct);
        }

        let kind = classify_host(&dest.host);
        let found = self.table.resolve(&dest.host, kind.is_ip());
        if let Some(c) = self.apply_upstream_policy(found) {
            return Pending::Done(c);
        }

        if !self.options.judge_by_ip {
            return Pending::Done(Classification::Forward);
        }

        match kind {
            HostKind::PrivateIp(_) => {
                self.table.set(&dest.host, Classification::Direct);
                Pending::Done(Classification::Direct)
            }
            HostKind::PublicIp(ip) => Pending::Judge(ip),
            HostKind::Name => Pending::Resolve,
        }
    }

    /// Without an upstream everything but `Reject` goes direct, matched or not.
    fn apply_upstream_policy(&self, found: Option<Classification>) -> Option<Classification> {
        if self.upstream.has_upstream() {
            return found;
        }
        match found {
            Some(Classification::Reject) => Some(Classification::Reject),
            _ => Some(Classification::Direct),
        }
    }

    fn finish_resolve(&self, host: &str, resolved: Result<IpAddr>) -> Classification {
        match resolved {
            Ok(ip) => self.learn(host, ip),
            Err(e) => {
                warn!(host = %host, error = %e, "error looking up host ip");
                Classification::Forward
            }
        }
    }

    /// Classify an address and remember the verdict for the exact host.
    fn learn(&self, host: &str, ip: IpAddr) -> Classification {
        let classification = if self.classifier.is_local(ip) {
            Classification::Direct
        } else {
            Classification::Forward
        };
        debug!(host = %host, ip = %ip, classification = %classification, "learned host");
        self.table.set(host, classification);
        classification
    }
}
