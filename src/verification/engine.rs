//! The `ValidationEngine` ties the individual checks together and produces a
//! single `ValidationResult` per address.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{DisposableConfidence, ValidationOptions, ValidationResult};
use crate::utils::disposable::{DisposableDomainMatcher, DisposableRules};
use crate::utils::dns::{DomainResolver, MxLookup, MxResolver, TrustDnsResolver};
use crate::utils::smtp::{ProbeOrchestrator, ProbeReport};
use crate::utils::syntax;
use crate::verification::scoring::{self, Signals};

use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use std::time::Instant;

/// Validates addresses end to end: syntax, disposable classification, MX
/// resolution, an optional SMTP probe and finally scoring.
///
/// Cheap to clone; clones share the resolver, the disposable rule set and the
/// SMTP session limit.
#[derive(Clone)]
pub struct ValidationEngine {
    config: Arc<Config>,
    resolver: DomainResolver,
    disposable: Arc<DisposableDomainMatcher>,
    smtp: ProbeOrchestrator,
}

impl ValidationEngine {
    /// Builds an engine backed by the configured DNS servers.
    pub fn new(config: Config) -> Result<Self> {
        let resolver = TrustDnsResolver::from_config(&config)?;
        Self::with_resolver(config, Arc::new(resolver))
    }

    /// Builds an engine around a caller-supplied MX source.
    pub fn with_resolver(config: Config, resolver: Arc<dyn MxResolver>) -> Result<Self> {
        let patterns = config.suspicious_patterns.clone();
        let rules = match &config.disposable_domains_path {
            Some(path) => DisposableRules::from_path(path, patterns)?,
            None => DisposableRules::embedded(patterns),
        };
        if rules.is_empty() {
            return Err(AppError::DisposableList(
                "Disposable domain list contains no domains".into(),
            ));
        }
        tracing::info!(target: "engine",
            "Validation engine ready ({} disposable domains, config: {})",
            rules.len(),
            config.loaded_config_path.as_deref().unwrap_or("defaults")
        );

        Ok(Self {
            resolver: DomainResolver::new(resolver, config.dns_timeout),
            disposable: Arc::new(DisposableDomainMatcher::new(rules)),
            smtp: ProbeOrchestrator::new(&config)?,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The live disposable matcher. Reloading it affects later validations only.
    pub fn disposable(&self) -> &DisposableDomainMatcher {
        &self.disposable
    }

    /// Validates one address.
    ///
    /// Everything that is wrong with the address itself ends up in the
    /// returned result. `Err` means the DNS resolver could not be reached
    /// at all.
    pub async fn validate(
        &self,
        address: &str,
        options: ValidationOptions,
    ) -> Result<ValidationResult> {
        let started = Instant::now();
        tracing::debug!(target: "engine", "Validating '{}' (smtp: {})", address, options.check_smtp);

        let checked = syntax::check(address);
        let (email, domain) = match (checked.normalized, checked.domain) {
            (Some(email), Some(domain)) if checked.valid => (email, domain),
            _ => {
                tracing::info!(target: "engine",
                    "'{}' rejected on syntax: {}", address,
                    checked.error.as_deref().unwrap_or("invalid")
                );
                return Ok(self.invalid_syntax(address, started));
            }
        };

        let disposable = self.disposable.classify(&domain);
        let MxLookup { has_mx, records, error: mx_error } = self.resolver.resolve(&domain).await?;

        let report: Option<ProbeReport> = if options.check_smtp && has_mx {
            Some(self.smtp.probe(&email, &records).await)
        } else {
            if options.check_smtp {
                tracing::debug!(target: "engine", "Skipping SMTP probe for <{}>: no MX records", email);
            }
            None
        };
        let outcome = report.as_ref().map(|r| &r.outcome);

        let score = scoring::score(&Signals {
            syntax_valid: true,
            has_mx,
            disposable: disposable.disposable,
            confidence: disposable.confidence,
            smtp: outcome,
        });

        let result = ValidationResult {
            is_valid: has_mx && !disposable.disposable,
            syntax_valid: true,
            domain: Some(domain),
            has_mx_records: has_mx,
            mx_records: records,
            mx_error,
            is_disposable: disposable.disposable,
            disposable_confidence: disposable.disposable.then_some(disposable.confidence),
            disposable_provider: disposable.provider,
            smtp_check_performed: report.is_some(),
            mailbox_exists: outcome.and_then(|o| o.mailbox_exists()),
            is_catch_all: outcome.and_then(|o| o.is_catch_all()),
            smtp_response_text: report.map(|r| r.response),
            deliverability_score: score.score,
            category: score.category,
            risk_level: score.risk,
            recommendations: score.recommendations,
            checked_at: Utc::now(),
            processing_time_ms: elapsed_ms(started),
            email,
        };

        tracing::info!(target: "engine",
            "<{}> scored {} ({}, risk {}) in {:.1}ms",
            result.email, result.deliverability_score, result.category,
            result.risk_level, result.processing_time_ms
        );
        Ok(result)
    }

    /// Validates `addresses` with at most `max_concurrency` in flight,
    /// yielding results in input order.
    pub fn validate_stream<'a, I>(
        &'a self,
        addresses: I,
        options: ValidationOptions,
    ) -> impl Stream<Item = Result<ValidationResult>> + 'a
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'a,
    {
        stream::iter(addresses)
            .map(move |address| async move { self.validate(&address, options).await })
            .buffered(self.config.max_concurrency)
    }

    /// Collecting form of [`Self::validate_stream`].
    pub async fn validate_batch<I>(
        &self,
        addresses: I,
        options: ValidationOptions,
    ) -> Vec<Result<ValidationResult>>
    where
        I: IntoIterator<Item = String>,
    {
        self.validate_stream(addresses, options).collect().await
    }

    fn invalid_syntax(&self, address: &str, started: Instant) -> ValidationResult {
        let score = scoring::score(&Signals {
            syntax_valid: false,
            has_mx: false,
            disposable: false,
            confidence: DisposableConfidence::High,
            smtp: None,
        });
        ValidationResult {
            email: address.trim().to_string(),
            is_valid: false,
            syntax_valid: false,
            domain: syntax::extract_domain(address),
            has_mx_records: false,
            mx_records: Vec::new(),
            mx_error: None,
            is_disposable: false,
            disposable_confidence: None,
            disposable_provider: None,
            smtp_check_performed: false,
            mailbox_exists: None,
            smtp_response_text: None,
            is_catch_all: None,
            deliverability_score: score.score,
            category: score.category,
            risk_level: score.risk,
            recommendations: score.recommendations,
            checked_at: Utc::now(),
            processing_time_ms: elapsed_ms(started),
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
