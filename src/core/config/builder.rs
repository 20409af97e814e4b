//! Layered construction of a [`Config`]: defaults, then file values, then
//! explicit overrides (typically from the command line).

use super::file::ConfigFile;
use super::validation::validate_config;
use super::Config;
use crate::core::error::Result;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    file: Option<ConfigFile>,
    file_path: Option<String>,
    smtp_timeout: Option<u64>,
    smtp_sender_email: Option<String>,
    max_concurrency: Option<usize>,
    disposable_domains_path: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies values read from a configuration file.
    pub fn with_file(mut self, file: ConfigFile, path: Option<String>) -> Self {
        self.file = Some(file);
        self.file_path = path;
        self
    }

    pub fn smtp_timeout(mut self, secs: Option<u64>) -> Self {
        if secs.is_some() {
            self.smtp_timeout = secs;
        }
        self
    }

    pub fn smtp_sender_email(mut self, sender: Option<String>) -> Self {
        if sender.is_some() {
            self.smtp_sender_email = sender;
        }
        self
    }

    pub fn max_concurrency(mut self, n: Option<usize>) -> Self {
        if n.is_some() {
            self.max_concurrency = n;
        }
        self
    }

    pub fn disposable_domains_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.disposable_domains_path = path;
        }
        self
    }

    /// Produces the final, validated configuration.
    pub fn build(self) -> Result<Config> {
        let mut config = Config::default();

        if let Some(file) = self.file {
            apply_file(&mut config, file);
            config.loaded_config_path = self.file_path;
        }

        if let Some(secs) = self.smtp_timeout {
            config.smtp_timeout = Duration::from_secs(secs);
        }
        if let Some(sender) = self.smtp_sender_email {
            config.smtp_sender_email = sender;
        }
        if let Some(n) = self.max_concurrency {
            config.max_concurrency = n;
        }
        if let Some(path) = self.disposable_domains_path {
            config.disposable_domains_path = Some(path);
        }

        validate_config(&config)?;
        tracing::debug!("Built configuration: {:?}", config);
        Ok(config)
    }
}

fn apply_file(config: &mut Config, file: ConfigFile) {
    if let Some(secs) = file.dns.dns_timeout {
        config.dns_timeout = Duration::from_secs(secs);
    }
    if let Some(servers) = file.dns.dns_servers {
        config.dns_servers = servers;
    }

    if let Some(secs) = file.smtp.smtp_timeout {
        config.smtp_timeout = Duration::from_secs(secs);
    }
    if let Some(port) = file.smtp.smtp_port {
        config.smtp_port = port;
    }
    if let Some(sender) = file.smtp.smtp_sender_email {
        config.smtp_sender_email = sender;
    }
    if let Some(helo) = file.smtp.smtp_helo_name {
        config.smtp_helo_name = helo;
    }
    if let Some(n) = file.smtp.max_mx_hosts {
        config.max_mx_hosts = n;
    }
    if let Some(n) = file.smtp.max_smtp_sessions {
        config.max_smtp_sessions = n;
    }

    if let Some(path) = file.disposable.domains_path {
        config.disposable_domains_path = Some(path);
    }
    if let Some(patterns) = file.disposable.suspicious_patterns {
        config.suspicious_patterns = patterns;
    }

    if let Some(n) = file.batch.max_concurrency {
        config.max_concurrency = n;
    }
}
