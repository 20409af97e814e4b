//! Defines the core runtime `Config` struct, its defaults, and related utilities.
//! Submodules handle loading, building, and validation.

pub(crate) mod builder;
pub(crate) mod file;
pub(crate) mod loading;
pub(crate) mod validation;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;
pub use loading::{find_config_file, load_config_file};
pub use validation::validate_config;

use std::path::PathBuf;
use std::time::Duration;

/// Substrings that mark a domain as probably disposable when it is not in the
/// known provider list.
pub const DEFAULT_SUSPICIOUS_PATTERNS: &[&str] = &[
    "temp",
    "trash",
    "spam",
    "fake",
    "disposable",
    "throwaway",
    "guerrilla",
    "temporary",
    "mailinator",
    "yopmail",
];

/// Runtime configuration settings used by the validation engine.
#[derive(Clone)]
pub struct Config {
    pub dns_timeout: Duration,
    /// Name servers to query. Empty means the system resolver configuration.
    pub dns_servers: Vec<String>,

    /// Bound on every SMTP network step: host lookup, connect, and each
    /// command/reply round trip.
    pub smtp_timeout: Duration,
    pub smtp_port: u16,
    pub smtp_sender_email: String,
    pub smtp_helo_name: String,
    pub max_mx_hosts: usize,
    pub max_smtp_sessions: usize,

    pub max_concurrency: usize,

    pub disposable_domains_path: Option<PathBuf>,
    pub suspicious_patterns: Vec<String>,

    pub loaded_config_path: Option<String>,
}

impl Config {
    fn build_default() -> Self {
        let dns_servers = vec![
            "8.8.8.8".to_string(),
            "8.8.4.4".to_string(),
            "1.1.1.1".to_string(),
            "1.0.0.1".to_string(),
        ];

        Config {
            dns_timeout: Duration::from_secs(5),
            dns_servers,
            smtp_timeout: Duration::from_secs(10),
            smtp_port: 25,
            smtp_sender_email: "verify-probe@example.com".to_string(),
            smtp_helo_name: "localhost".to_string(),
            max_mx_hosts: 3,
            max_smtp_sessions: 5,
            max_concurrency: 10,
            disposable_domains_path: None,
            suspicious_patterns: DEFAULT_SUSPICIOUS_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            loaded_config_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::build_default()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("dns_timeout", &self.dns_timeout)
            .field("dns_servers_count", &self.dns_servers.len())
            .field("smtp_timeout", &self.smtp_timeout)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_sender_email", &self.smtp_sender_email)
            .field("smtp_helo_name", &self.smtp_helo_name)
            .field("max_mx_hosts", &self.max_mx_hosts)
            .field("max_smtp_sessions", &self.max_smtp_sessions)
            .field("max_concurrency", &self.max_concurrency)
            .field("disposable_domains_path", &self.disposable_domains_path)
            .field(
                "suspicious_patterns_count",
                &self.suspicious_patterns.len(),
            )
            .field("loaded_config_path", &self.loaded_config_path)
            .finish()
    }
}
