//! Defines the structure mirroring the TOML configuration file format.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub(crate) dns: DnsConfig,
    #[serde(default)]
    pub(crate) smtp: SmtpConfig,
    #[serde(default)]
    pub(crate) disposable: DisposableConfig,
    #[serde(default)]
    pub(crate) batch: BatchConfig,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DnsConfig {
    pub(crate) dns_timeout: Option<u64>,
    pub(crate) dns_servers: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct SmtpConfig {
    pub(crate) smtp_timeout: Option<u64>,
    pub(crate) smtp_port: Option<u16>,
    pub(crate) smtp_sender_email: Option<String>,
    pub(crate) smtp_helo_name: Option<String>,
    pub(crate) max_mx_hosts: Option<usize>,
    pub(crate) max_smtp_sessions: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct DisposableConfig {
    pub(crate) domains_path: Option<PathBuf>,
    pub(crate) suspicious_patterns: Option<Vec<String>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct BatchConfig {
    pub(crate) max_concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_file() {
        let raw = r#"
            [smtp]
            smtp_timeout = 3
            smtp_sender_email = "probe@mydomain.test"

            [disposable]
            suspicious_patterns = ["burner"]
        "#;
        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(file.smtp.smtp_timeout, Some(3));
        assert_eq!(
            file.smtp.smtp_sender_email.as_deref(),
            Some("probe@mydomain.test")
        );
        assert!(file.dns.dns_servers.is_none());
        assert_eq!(
            file.disposable.suspicious_patterns,
            Some(vec!["burner".to_string()])
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        let raw = r#"
            [smtp]
            smtp_timeot = 3
        "#;
        assert!(toml::from_str::<ConfigFile>(raw).is_err());
    }
}
