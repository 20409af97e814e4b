//! MX resolution for address domains.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{MxLookupErrorKind, MxRecord};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// Why a raw MX query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsFailure {
    NoSuchDomain,
    NoAnswer,
    Timeout,
    /// No name server could be contacted at all.
    Unreachable(String),
    Other(String),
}

impl From<ResolveError> for DnsFailure {
    fn from(err: ResolveError) -> Self {
        match err.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                if *response_code == ResponseCode::NXDomain {
                    DnsFailure::NoSuchDomain
                } else {
                    DnsFailure::NoAnswer
                }
            }
            // Unreachable UDP name servers usually surface here too. A timeout
            // cannot be told apart from one slow authoritative server, so it
            // stays a per-domain failure.
            ResolveErrorKind::Timeout => DnsFailure::Timeout,
            ResolveErrorKind::NoConnections => DnsFailure::Unreachable(err.to_string()),
            _ => DnsFailure::Other(err.to_string()),
        }
    }
}

/// Source of raw MX answers. Records are returned in response order.
#[async_trait]
pub trait MxResolver: Send + Sync {
    async fn query_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsFailure>;
}

/// [`MxResolver`] backed by a tokio `trust-dns` resolver.
pub struct TrustDnsResolver {
    inner: TokioAsyncResolver,
}

impl TrustDnsResolver {
    /// Builds a resolver for the configured name servers, or from the system
    /// configuration when none are configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.dns_timeout;
        opts.attempts = 2;

        let inner = if config.dns_servers.is_empty() {
            TokioAsyncResolver::tokio_from_system_conf().map_err(|e| {
                AppError::Initialization(format!("Failed to read system DNS configuration: {}", e))
            })?
        } else {
            let ips = config
                .dns_servers
                .iter()
                .map(|s| {
                    s.parse::<IpAddr>().map_err(|e| {
                        AppError::Config(format!("Invalid DNS server address '{}': {}", s, e))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let group = NameServerConfigGroup::from_ips_clear(&ips, 53, true);
            TokioAsyncResolver::tokio(ResolverConfig::from_parts(None, vec![], group), opts)
        };

        tracing::debug!(target: "dns_task",
            "DNS resolver initialised ({} configured servers, timeout {:?})",
            config.dns_servers.len(), config.dns_timeout
        );
        Ok(Self { inner })
    }
}

#[async_trait]
impl MxResolver for TrustDnsResolver {
    async fn query_mx(&self, domain: &str) -> std::result::Result<Vec<MxRecord>, DnsFailure> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));
        let lookup = self.inner.mx_lookup(fqdn).await?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.exchange().to_utf8(), mx.preference()))
            .collect())
    }
}

/// Result of [`DomainResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxLookup {
    pub has_mx: bool,
    /// Ascending by priority; ties keep response order.
    pub records: Vec<MxRecord>,
    pub error: Option<MxLookupErrorKind>,
}

impl MxLookup {
    fn failed(kind: MxLookupErrorKind) -> Self {
        Self {
            has_mx: false,
            records: Vec::new(),
            error: Some(kind),
        }
    }
}

/// Bounded-time MX lookups returning priority-sorted records.
#[derive(Clone)]
pub struct DomainResolver {
    resolver: Arc<dyn MxResolver>,
    timeout: Duration,
}

impl DomainResolver {
    pub fn new(resolver: Arc<dyn MxResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    /// Resolves the MX set for `domain`.
    ///
    /// Lookup failures degrade to `has_mx = false` with an error kind. The
    /// only `Err` is [`AppError::ResolverUnavailable`], which concerns the
    /// resolver rather than the domain. It is raised only when the resolver
    /// has no usable connection at all; name servers that merely stop
    /// answering show up as [`MxLookupErrorKind::Timeout`].
    pub async fn resolve(&self, domain: &str) -> Result<MxLookup> {
        tracing::debug!(target: "dns_task", "Looking up MX records for {}", domain);

        let answer =
            match tokio::time::timeout(self.timeout, self.resolver.query_mx(domain)).await {
                Ok(answer) => answer,
                Err(_) => Err(DnsFailure::Timeout),
            };

        let mut records = match answer {
            Ok(records) => records,
            Err(DnsFailure::Unreachable(msg)) => {
                tracing::error!(target: "dns_task", "No DNS server reachable while resolving {}: {}", domain, msg);
                return Err(AppError::ResolverUnavailable(msg));
            }
            Err(failure) => {
                let kind = match failure {
                    DnsFailure::NoSuchDomain => MxLookupErrorKind::NoSuchDomain,
                    DnsFailure::NoAnswer => MxLookupErrorKind::NoAnswer,
                    DnsFailure::Timeout => MxLookupErrorKind::Timeout,
                    DnsFailure::Unreachable(_) | DnsFailure::Other(_) => MxLookupErrorKind::Other,
                };
                tracing::info!(target: "dns_task", "MX lookup for {} failed: {} ({:?})", domain, kind, failure);
                return Ok(MxLookup::failed(kind));
            }
        };

        for record in &mut records {
            record.host = record.host.trim().trim_end_matches('.').to_ascii_lowercase();
        }
        // A null MX (RFC 7505) has an empty exchange and means "accepts no mail".
        records.retain(|r| !r.host.is_empty());
        if records.is_empty() {
            tracing::info!(target: "dns_task", "Domain {} publishes no usable MX records", domain);
            return Ok(MxLookup::failed(MxLookupErrorKind::NoAnswer));
        }

        records.sort_by_key(|r| r.priority);
        tracing::debug!(target: "dns_task", "Found {} MX records for {}: {:?}", records.len(), domain, records);

        Ok(MxLookup {
            has_mx: true,
            records,
            error: None,
        })
    }
}
