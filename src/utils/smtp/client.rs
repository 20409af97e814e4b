//! Provides the `ProbeOrchestrator`, which walks a domain's MX hosts in
//! priority order until one gives a usable answer.

use super::result::{InconclusiveReason, ProbeReport};
use super::session::MailboxProbe;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::models::MxRecord;

use lettre::Address;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs [`MailboxProbe`] across up to `max_mx_hosts` MX hosts.
#[derive(Clone)]
pub struct ProbeOrchestrator {
    probe: MailboxProbe,
    max_hosts: usize,
    sessions: Arc<Semaphore>,
}

impl ProbeOrchestrator {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            probe: MailboxProbe::new(config)?,
            max_hosts: config.max_mx_hosts,
            sessions: Arc::new(Semaphore::new(config.max_smtp_sessions)),
        })
    }

    /// Probes `email` against `records`.
    ///
    /// Transport-level inconclusive results move on to the next host. Any
    /// other outcome, including a policy-driven inconclusive reply, is
    /// returned as is. When every host tried was inconclusive the last
    /// report is returned unchanged.
    pub async fn probe(&self, email: &str, records: &[MxRecord]) -> ProbeReport {
        let recipient = match Address::from_str(email) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::error!(target: "smtp_task", "Invalid recipient email format '{}': {}", email, e);
                return ProbeReport::inconclusive(
                    None,
                    InconclusiveReason::InvalidRecipient(e.to_string()),
                    None,
                );
            }
        };

        let mut ordered: Vec<&MxRecord> = records.iter().collect();
        ordered.sort_by_key(|r| r.priority);

        let mut last = ProbeReport::inconclusive(None, InconclusiveReason::NoMailServers, None);
        let attempts = ordered.len().min(self.max_hosts);

        for (attempt, record) in ordered.into_iter().take(self.max_hosts).enumerate() {
            tracing::debug!(target: "smtp_task",
                "Attempt {}/{} to verify <{}> via MX {} (priority {})",
                attempt + 1, attempts, email, record.host, record.priority
            );

            let report = {
                let _permit = match self.sessions.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        tracing::error!(target: "smtp_task", "SMTP session limiter closed: {}", e);
                        return ProbeReport::inconclusive(
                            Some(record.host.as_str()),
                            InconclusiveReason::Io(e.to_string()),
                            None,
                        );
                    }
                };
                self.probe.probe(&record.host, &recipient).await
            };

            if !report.outcome.is_retryable() {
                return report;
            }

            tracing::warn!(target: "smtp_task",
                "SMTP check for <{}> inconclusive on {} ({}). Will try next MX if any remain.",
                email, record.host, report.response
            );
            last = report;
        }

        tracing::info!(target: "smtp_task",
            "All {} MX hosts tried for <{}> were inconclusive; last: {}", attempts, email, last.response);
        last
    }
}
