//! Deliverability scoring. Pure functions, no I/O.
//!
//! | signal                          | points |
//! |---------------------------------|--------|
//! | valid syntax                    | 20     |
//! | MX records present              | 30     |
//! | not disposable                  | 25     |
//! | disposable, medium confidence   | 10     |
//! | mailbox accepted                | 25     |
//! | mailbox accepted, catch-all     | 10     |
//! | SMTP inconclusive / not run     | 15 if MX and not disposable, else 5 |
//!
//! Invalid syntax is always 0.

use crate::core::models::{DisposableConfidence, RiskLevel, ScoreCategory};
use crate::utils::smtp::ProbeOutcome;

const SYNTAX_POINTS: f64 = 20.0;
const MX_POINTS: f64 = 30.0;
const NOT_DISPOSABLE_POINTS: f64 = 25.0;
const MEDIUM_DISPOSABLE_POINTS: f64 = 10.0;
const MAILBOX_POINTS: f64 = 25.0;
const CATCH_ALL_POINTS: f64 = 10.0;
const UNVERIFIED_FAVORABLE_POINTS: f64 = 15.0;
const UNVERIFIED_POINTS: f64 = 5.0;

pub const MSG_INVALID_SYNTAX: &str = "Email syntax is invalid. Verify the email format.";
pub const MSG_NO_MX: &str = "Domain has no MX records. Email delivery will fail.";
pub const MSG_DISPOSABLE: &str =
    "This is a disposable/temporary email. Consider blocking for important communications.";
pub const MSG_LIKELY_DISPOSABLE: &str =
    "Domain looks like a disposable/temporary email provider. Review before relying on it.";
pub const MSG_MAILBOX_ABSENT: &str = "Mailbox does not exist or is not accepting mail.";
pub const MSG_CATCH_ALL: &str =
    "Domain accepts mail for any address (catch-all). Mailbox existence cannot be confirmed.";
pub const MSG_UNVERIFIED: &str =
    "Could not verify mailbox existence. Server may block verification attempts.";
pub const MSG_NOT_CHECKED: &str =
    "Mailbox existence was not checked. Enable SMTP verification for higher confidence.";

/// The signals the score is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signals<'a> {
    pub syntax_valid: bool,
    pub has_mx: bool,
    pub disposable: bool,
    pub confidence: DisposableConfidence,
    /// `None` when no SMTP probe was performed.
    pub smtp: Option<&'a ProbeOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub score: f64,
    pub category: ScoreCategory,
    pub risk: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Computes score, category, risk and recommendations for `signals`.
pub fn score(signals: &Signals<'_>) -> Score {
    let value = points(signals);
    let score = Score {
        score: value,
        category: category(value),
        risk: risk_level(value),
        recommendations: recommendations(signals, value),
    };
    tracing::debug!(target: "scoring", "Scored {:?} -> {} ({}, risk {})", signals, score.score, score.category, score.risk);
    score
}

fn points(signals: &Signals<'_>) -> f64 {
    if !signals.syntax_valid {
        return 0.0;
    }

    let mut total = SYNTAX_POINTS;

    if signals.has_mx {
        total += MX_POINTS;
    }

    total += match (signals.disposable, signals.confidence) {
        (false, _) => NOT_DISPOSABLE_POINTS,
        (true, DisposableConfidence::Medium) => MEDIUM_DISPOSABLE_POINTS,
        (true, DisposableConfidence::High) => 0.0,
    };

    total += match signals.smtp {
        Some(ProbeOutcome::Exists { catch_all: false }) => MAILBOX_POINTS,
        Some(ProbeOutcome::Exists { catch_all: true }) => CATCH_ALL_POINTS,
        Some(ProbeOutcome::Absent) => 0.0,
        Some(ProbeOutcome::Inconclusive(_)) | None => {
            if signals.has_mx && !signals.disposable {
                UNVERIFIED_FAVORABLE_POINTS
            } else {
                UNVERIFIED_POINTS
            }
        }
    };

    (total.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

pub fn category(score: f64) -> ScoreCategory {
    if score >= 90.0 {
        ScoreCategory::Excellent
    } else if score >= 70.0 {
        ScoreCategory::Good
    } else if score >= 50.0 {
        ScoreCategory::Fair
    } else if score > 0.0 {
        ScoreCategory::Poor
    } else {
        ScoreCategory::Invalid
    }
}

pub fn risk_level(score: f64) -> RiskLevel {
    if score >= 80.0 {
        RiskLevel::Low
    } else if score >= 60.0 {
        RiskLevel::Medium
    } else if score >= 40.0 {
        RiskLevel::High
    } else {
        RiskLevel::VeryHigh
    }
}

fn recommendations(signals: &Signals<'_>, score: f64) -> Vec<String> {
    let mut out = Vec::new();

    if !signals.syntax_valid {
        out.push(MSG_INVALID_SYNTAX);
    } else {
        if !signals.has_mx {
            out.push(MSG_NO_MX);
        }
        if signals.disposable {
            out.push(match signals.confidence {
                DisposableConfidence::High => MSG_DISPOSABLE,
                DisposableConfidence::Medium => MSG_LIKELY_DISPOSABLE,
            });
        }
        match signals.smtp {
            Some(ProbeOutcome::Absent) => out.push(MSG_MAILBOX_ABSENT),
            Some(ProbeOutcome::Exists { catch_all: true }) => out.push(MSG_CATCH_ALL),
            Some(ProbeOutcome::Inconclusive(_)) if signals.has_mx => out.push(MSG_UNVERIFIED),
            None if signals.has_mx => out.push(MSG_NOT_CHECKED),
            _ => {}
        }
    }

    out.push(if score >= 90.0 {
        "Email appears highly deliverable."
    } else if score >= 70.0 {
        "Email should be deliverable with low risk."
    } else if score >= 50.0 {
        "Email may be deliverable but has some concerns."
    } else if score > 0.0 {
        "Email has significant deliverability issues."
    } else {
        "Email is not deliverable."
    });

    out.into_iter().map(str::to_string).collect()
}
