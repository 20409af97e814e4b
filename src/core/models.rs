//! Data structures shared across the pipeline and returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single mail exchanger for a domain. Lower `priority` is tried first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub host: String,
    pub priority: u16,
}

impl MxRecord {
    pub fn new(host: impl Into<String>, priority: u16) -> Self {
        Self {
            host: host.into(),
            priority,
        }
    }
}

/// Why an MX lookup produced no usable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MxLookupErrorKind {
    /// NXDOMAIN.
    NoSuchDomain,
    /// The domain exists but publishes no (usable) MX records.
    NoAnswer,
    Timeout,
    Other,
}

impl fmt::Display for MxLookupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MxLookupErrorKind::NoSuchDomain => "domain does not exist",
            MxLookupErrorKind::NoAnswer => "no MX records found",
            MxLookupErrorKind::Timeout => "DNS query timed out",
            MxLookupErrorKind::Other => "DNS lookup failed",
        };
        f.write_str(s)
    }
}

/// How sure the disposable classification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposableConfidence {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreCategory {
    Excellent,
    Good,
    Fair,
    Poor,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl fmt::Display for ScoreCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::VeryHigh => f.write_str("Very High"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

/// Per-call options for [`crate::ValidationEngine::validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOptions {
    pub check_smtp: bool,
}

impl ValidationOptions {
    pub fn with_smtp() -> Self {
        Self { check_smtp: true }
    }
}

/// The outcome of validating one address. Built once by the engine and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// The normalized address when the syntax is valid, otherwise the raw input.
    pub email: String,
    pub is_valid: bool,
    pub syntax_valid: bool,
    pub domain: Option<String>,
    #[serde(rename = "hasMXRecords")]
    pub has_mx_records: bool,
    pub mx_records: Vec<MxRecord>,
    pub mx_error: Option<MxLookupErrorKind>,
    pub is_disposable: bool,
    pub disposable_confidence: Option<DisposableConfidence>,
    pub disposable_provider: Option<String>,
    pub smtp_check_performed: bool,
    /// `None` when SMTP was skipped or inconclusive.
    pub mailbox_exists: Option<bool>,
    pub smtp_response_text: Option<String>,
    pub is_catch_all: Option<bool>,
    pub deliverability_score: f64,
    pub category: ScoreCategory,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
    pub processing_time_ms: f64,
}
