//! Disposable / temporary email domain classification.
//!
//! The rule set is immutable once built. Reloading builds a fresh
//! [`DisposableRules`] and swaps the shared `Arc`, so a lookup that is already
//! running keeps the snapshot it started with.

use crate::core::error::{AppError, Result};
use crate::core::models::DisposableConfidence;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

static EMBEDDED_DOMAINS: &str = include_str!("../../data/disposable_domains.txt");

/// Outcome of [`DisposableDomainMatcher::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposableCheck {
    pub disposable: bool,
    pub confidence: DisposableConfidence,
    pub provider: Option<String>,
}

impl DisposableCheck {
    fn clean() -> Self {
        Self {
            disposable: false,
            confidence: DisposableConfidence::High,
            provider: None,
        }
    }

    fn matched(provider: &str, confidence: DisposableConfidence) -> Self {
        Self {
            disposable: true,
            confidence,
            provider: Some(provider.to_string()),
        }
    }
}

/// Known provider domains plus heuristic substrings.
#[derive(Debug, Clone, Default)]
pub struct DisposableRules {
    domains: HashSet<String>,
    patterns: Vec<String>,
}

impl DisposableRules {
    pub fn new<D, P>(domains: D, patterns: P) -> Self
    where
        D: IntoIterator,
        D::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Parses a list with one domain per line. Blank lines and `#` comments
    /// are skipped.
    pub fn from_list<P>(content: &str, patterns: P) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let domains = content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty());
        let rules = Self::new(domains, patterns);
        if rules.domains.is_empty() {
            return Err(AppError::DisposableList(
                "list contains no domains".to_string(),
            ));
        }
        Ok(rules)
    }

    /// The list compiled into the binary.
    pub fn embedded<P>(patterns: P) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self::from_list(EMBEDDED_DOMAINS, patterns).unwrap_or_default()
    }

    pub fn from_path<P>(path: &Path, patterns: P) -> Result<Self>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::DisposableList(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_list(&content, patterns)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    fn classify(&self, domain: &str) -> DisposableCheck {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.is_empty() {
            return DisposableCheck::clean();
        }

        if self.domains.contains(&domain) {
            return DisposableCheck::matched(&domain, DisposableConfidence::High);
        }

        // Walk parent suffixes: a.b.provider.com -> b.provider.com -> provider.com -> com
        let mut rest = domain.as_str();
        while let Some((_, parent)) = rest.split_once('.') {
            if self.domains.contains(parent) {
                return DisposableCheck::matched(parent, DisposableConfidence::High);
            }
            rest = parent;
        }

        if self.patterns.iter().any(|p| domain.contains(p.as_str())) {
            return DisposableCheck::matched(&domain, DisposableConfidence::Medium);
        }

        DisposableCheck::clean()
    }
}

/// Classifies domains against a hot-swappable [`DisposableRules`] snapshot.
#[derive(Debug)]
pub struct DisposableDomainMatcher {
    rules: RwLock<Arc<DisposableRules>>,
}

impl DisposableDomainMatcher {
    pub fn new(rules: DisposableRules) -> Self {
        Self {
            rules: RwLock::new(Arc::new(rules)),
        }
    }

    /// Current rule snapshot.
    pub fn rules(&self) -> Arc<DisposableRules> {
        Arc::clone(&self.rules.read())
    }

    pub fn classify(&self, domain: &str) -> DisposableCheck {
        let result = self.rules().classify(domain);
        if result.disposable {
            tracing::debug!(target: "disposable",
                "Domain '{}' classified disposable (provider={:?}, confidence={:?})",
                domain, result.provider, result.confidence
            );
        }
        result
    }

    /// Replaces the whole rule set.
    pub fn reload(&self, rules: DisposableRules) {
        let count = rules.len();
        *self.rules.write() = Arc::new(rules);
        tracing::info!(target: "disposable", "Disposable rule set reloaded with {} domains", count);
    }

    pub fn reload_from_path(&self, path: &Path) -> Result<()> {
        let patterns = self.rules().patterns.clone();
        let rules = DisposableRules::from_path(path, patterns)?;
        self.reload(rules);
        Ok(())
    }

    /// Adds domains by building a new set that includes them and swapping it in.
    pub fn extend<I>(&self, domains: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut guard = self.rules.write();
        let mut next = DisposableRules::clone(&guard);
        next.domains.extend(
            domains
                .into_iter()
                .map(|d| d.as_ref().trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty()),
        );
        *guard = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.rules().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules().is_empty()
    }
}
