//! Startup checks on a [`Config`]. Anything rejected here is a process-level
//! misconfiguration and must fail loudly before any address is validated.

use super::Config;
use crate::core::error::{AppError, Result};
use lettre::Address;
use std::str::FromStr;

pub fn validate_config(config: &Config) -> Result<()> {
    if config.dns_timeout.is_zero() {
        return Err(AppError::Config("dns_timeout must be greater than zero".into()));
    }
    if config.smtp_timeout.is_zero() {
        return Err(AppError::Config(
            "smtp_timeout must be greater than zero".into(),
        ));
    }
    if config.smtp_port == 0 {
        return Err(AppError::Config("smtp_port must not be 0".into()));
    }
    if config.max_mx_hosts == 0 {
        return Err(AppError::Config("max_mx_hosts must be at least 1".into()));
    }
    if config.max_smtp_sessions == 0 {
        return Err(AppError::Config(
            "max_smtp_sessions must be at least 1".into(),
        ));
    }
    if config.max_concurrency == 0 {
        return Err(AppError::Config("max_concurrency must be at least 1".into()));
    }
    if config.smtp_helo_name.trim().is_empty() {
        return Err(AppError::Config("smtp_helo_name must not be empty".into()));
    }

    Address::from_str(&config.smtp_sender_email).map_err(|e| {
        AppError::Config(format!(
            "Invalid sender email '{}' in config: {}",
            config.smtp_sender_email, e
        ))
    })?;

    for server in &config.dns_servers {
        server.parse::<std::net::IpAddr>().map_err(|e| {
            AppError::Config(format!("Invalid DNS server address '{}': {}", server, e))
        })?;
    }

    if config
        .suspicious_patterns
        .iter()
        .any(|p| p.trim().is_empty())
    {
        return Err(AppError::Config(
            "suspicious_patterns must not contain empty entries".into(),
        ));
    }

    Ok(())
}
