//! Email deliverability validation.
//!
//! [`ValidationEngine`] checks an address's syntax, classifies its domain
//! against known disposable providers, resolves the domain's MX records and
//! can optionally ask the mail server whether the mailbox exists. The
//! signals are folded into a 0-100 deliverability score.

pub mod core;
pub mod utils;
pub mod verification;

pub use crate::core::config::{Config, ConfigBuilder};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    DisposableConfidence, MxLookupErrorKind, MxRecord, RiskLevel, ScoreCategory,
    ValidationOptions, ValidationResult,
};
pub use crate::verification::ValidationEngine;
