//! Address syntax checking and normalization. No I/O.

use lettre::Address;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

static ADDRESS_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("Address shape regex failed to compile. This is a bug.")
});

/// Result of a syntax check. A failed check is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheck {
    pub valid: bool,
    pub normalized: Option<String>,
    pub domain: Option<String>,
    pub error: Option<String>,
}

impl SyntaxCheck {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            normalized: None,
            domain: None,
            error: Some(reason.into()),
        }
    }
}

/// Checks the structure of `address` and returns its normalized form.
///
/// The domain is lower-cased; the local part is kept as written. Checking the
/// normalized output again yields the same normalized string.
pub fn check(address: &str) -> SyntaxCheck {
    let address = address.trim();

    if address.is_empty() {
        return SyntaxCheck::invalid("Email address is empty");
    }
    if address.len() > MAX_ADDRESS_LEN {
        return SyntaxCheck::invalid(format!(
            "Email address exceeds {} characters",
            MAX_ADDRESS_LEN
        ));
    }
    if !address.contains('@') {
        return SyntaxCheck::invalid("Email address is missing '@'");
    }
    if !ADDRESS_SHAPE.is_match(address) {
        return SyntaxCheck::invalid("Invalid email format");
    }

    // The shape regex admits exactly one '@'.
    let Some((local, domain)) = address.split_once('@') else {
        return SyntaxCheck::invalid("Email address is missing '@'");
    };

    if let Err(reason) = check_local_part(local) {
        return SyntaxCheck::invalid(reason);
    }
    let domain = domain.to_ascii_lowercase();
    if let Err(reason) = check_domain(&domain) {
        return SyntaxCheck::invalid(reason);
    }

    let normalized = format!("{}@{}", local, domain);
    if let Err(e) = Address::from_str(&normalized) {
        tracing::debug!(target: "syntax", "Address parser rejected '{}': {}", normalized, e);
        return SyntaxCheck::invalid(format!("Invalid email address: {}", e));
    }

    SyntaxCheck {
        valid: true,
        normalized: Some(normalized),
        domain: Some(domain),
        error: None,
    }
}

/// Returns the lower-cased domain part of `address`, if any.
pub fn extract_domain(address: &str) -> Option<String> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
}

fn check_local_part(local: &str) -> Result<(), String> {
    if local.len() > MAX_LOCAL_LEN {
        return Err(format!(
            "Local part exceeds {} characters",
            MAX_LOCAL_LEN
        ));
    }
    if local.starts_with('.') || local.ends_with('.') {
        return Err("Local part must not start or end with '.'".into());
    }
    if local.contains("..") {
        return Err("Local part must not contain consecutive dots".into());
    }
    Ok(())
}

fn check_domain(domain: &str) -> Result<(), String> {
    for label in domain.split('.') {
        if label.is_empty() {
            return Err("Domain contains an empty label".into());
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(format!(
                "Domain label exceeds {} characters",
                MAX_LABEL_LEN
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err("Domain labels must not start or end with '-'".into());
        }
    }
    Ok(())
}
