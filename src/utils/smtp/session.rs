//! Single-host SMTP mailbox probe.
//!
//! One TCP session per call:
//! greeting (220) → EHLO (HELO fallback) → MAIL FROM → RCPT TO target →
//! RCPT TO fabricated address (catch-all check) → QUIT. No DATA is ever sent.
//! Every network step is bounded by the configured SMTP timeout, and every
//! failure is reported as [`ProbeOutcome::Inconclusive`] rather than an error.

use super::error::handle_io_error;
use super::result::{InconclusiveReason, ProbeOutcome, ProbeReport, SmtpStage};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};

use lettre::transport::smtp::commands::{Ehlo, Mail, Quit, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use lettre::transport::smtp::response::Response;
use lettre::Address;
use rand::Rng;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Reply wording that means the mailbox does not exist, whatever the code.
const NON_EXISTENCE_PHRASES: &[&str] = &[
    "no such user",
    "unknown user",
    "does not exist",
    "mailbox unavailable",
    "mailbox not found",
    "invalid recipient",
    "recipient rejected",
    "user unknown",
];

const MAX_REPLY_BYTES: usize = 16 * 1024;
const MAX_ADDRESSES_PER_HOST: usize = 2;
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// A parsed SMTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.text)
        }
    }
}

/// Interprets the reply to RCPT TO for the target address.
pub fn classify_rcpt(reply: &Reply) -> ProbeOutcome {
    let text = reply.text.to_lowercase();
    if NON_EXISTENCE_PHRASES.iter().any(|p| text.contains(p)) {
        return ProbeOutcome::Absent;
    }

    match reply.code {
        250 | 251 => ProbeOutcome::Exists { catch_all: false },
        // Temporarily unavailable is not "does not exist".
        450 | 451 | 452 => ProbeOutcome::Exists { catch_all: false },
        550 | 551 | 553 => {
            ProbeOutcome::Inconclusive(InconclusiveReason::AmbiguousRejection(reply.code))
        }
        200..=299 => ProbeOutcome::Exists { catch_all: false },
        code => ProbeOutcome::Inconclusive(InconclusiveReason::UnexpectedReply(code)),
    }
}

/// An early exit from the session, with the reply that caused it if any.
struct Aborted {
    reason: InconclusiveReason,
    reply: Option<String>,
}

impl Aborted {
    fn with_reply(reason: InconclusiveReason, reply: &Reply) -> Self {
        Self {
            reason,
            reply: Some(reply.to_string()),
        }
    }
}

impl From<InconclusiveReason> for Aborted {
    fn from(reason: InconclusiveReason) -> Self {
        Self { reason, reply: None }
    }
}

struct SmtpSession {
    stream: BufStream<TcpStream>,
    host: String,
    timeout: Duration,
}

impl SmtpSession {
    async fn connect(
        host: &str,
        port: u16,
        limit: Duration,
    ) -> std::result::Result<Self, InconclusiveReason> {
        let addrs: Vec<SocketAddr> =
            match timeout(limit, tokio::net::lookup_host((host, port))).await {
                Err(_) => return Err(InconclusiveReason::Timeout(SmtpStage::Connect)),
                Ok(Err(e)) => {
                    tracing::warn!(target: "smtp_task", "Could not resolve mail server address {}: {}", host, e);
                    return Err(InconclusiveReason::HostUnresolvable(host.to_string()));
                }
                Ok(Ok(addrs)) => addrs.take(MAX_ADDRESSES_PER_HOST).collect(),
            };

        if addrs.is_empty() {
            tracing::warn!(target: "smtp_task", "Mail server {} resolved to no addresses", host);
            return Err(InconclusiveReason::HostUnresolvable(host.to_string()));
        }

        let mut last = InconclusiveReason::HostUnresolvable(host.to_string());
        for addr in addrs {
            tracing::debug!(target: "smtp_task", "Attempting SMTP connection to {} at {}", host, addr);
            match timeout(limit, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    return Ok(Self {
                        stream: BufStream::new(stream),
                        host: host.to_string(),
                        timeout: limit,
                    });
                }
                Ok(Err(e)) => last = handle_io_error(&e, SmtpStage::Connect, host),
                Err(_) => {
                    tracing::warn!(target: "smtp_task", "Connection to {} at {} timed out", host, addr);
                    last = InconclusiveReason::Timeout(SmtpStage::Connect);
                }
            }
        }
        Err(last)
    }

    async fn read_reply(
        &mut self,
        stage: SmtpStage,
    ) -> std::result::Result<Reply, InconclusiveReason> {
        let limit = self.timeout;
        let result = timeout(limit, self.read_reply_unbounded(stage)).await;
        match result {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(target: "smtp_task", "Timed out waiting for {} reply from {}", stage, self.host);
                Err(InconclusiveReason::Timeout(stage))
            }
        }
    }

    async fn read_reply_unbounded(
        &mut self,
        stage: SmtpStage,
    ) -> std::result::Result<Reply, InconclusiveReason> {
        let mut lines: Vec<String> = Vec::new();
        let mut total = 0usize;
        loop {
            // One byte past the cap tells an oversized reply from one that fits exactly.
            let budget = (MAX_REPLY_BYTES + 1).saturating_sub(total) as u64;
            let mut buf = Vec::new();
            let read = (&mut self.stream).take(budget).read_until(b'\n', &mut buf).await;
            let n = match read {
                Ok(n) => n,
                Err(e) => return Err(handle_io_error(&e, stage, &self.host)),
            };
            if n == 0 {
                tracing::warn!(target: "smtp_task",
                    "{} closed the connection during {}", self.host, stage);
                return Err(InconclusiveReason::Disconnected(stage));
            }

            total += n;
            if total > MAX_REPLY_BYTES {
                tracing::warn!(target: "smtp_task",
                    "{} reply from {} exceeds {} bytes", stage, self.host, MAX_REPLY_BYTES);
                return Err(InconclusiveReason::MalformedReply(stage));
            }

            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(&['\r', '\n'][..])
                .to_string();
            // "250-..." continues a multi-line reply; "250 ..." or "250" ends it.
            let last = line.as_bytes().get(3) != Some(&b'-');
            lines.push(line);
            if last {
                break;
            }
        }

        parse_reply(&lines).ok_or_else(|| {
            tracing::warn!(target: "smtp_task",
                "Unparseable {} reply from {}: {:?}", stage, self.host, lines);
            InconclusiveReason::MalformedReply(stage)
        })
    }

    async fn send(
        &mut self,
        line: &str,
        stage: SmtpStage,
    ) -> std::result::Result<(), InconclusiveReason> {
        tracing::trace!(target: "smtp_task", "C: {} -> {}", line.trim_end(), self.host);

        let stream = &mut self.stream;
        let written = timeout(self.timeout, async move {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        })
        .await;
        match written {
            Err(_) => Err(InconclusiveReason::Timeout(stage)),
            Ok(Err(e)) => Err(handle_io_error(&e, stage, &self.host)),
            Ok(Ok(())) => Ok(()),
        }
    }

    async fn command<C: fmt::Display>(
        &mut self,
        command: C,
        stage: SmtpStage,
    ) -> std::result::Result<Reply, InconclusiveReason> {
        self.send(&command.to_string(), stage).await?;
        let reply = self.read_reply(stage).await?;
        tracing::trace!(target: "smtp_task", "S: {} <- {}", reply, self.host);
        Ok(reply)
    }

    /// Best-effort QUIT and socket shutdown. Failures are logged, never returned.
    ///
    /// A peer that already hung up gets nothing. A peer that stalled or sent
    /// garbage gets QUIT without waiting for its reply.
    async fn quit(mut self, outcome: &ProbeOutcome) {
        self.timeout = self.timeout.min(QUIT_TIMEOUT);
        let result = match outcome {
            ProbeOutcome::Inconclusive(InconclusiveReason::Disconnected(_)) => Ok(()),
            ProbeOutcome::Inconclusive(
                InconclusiveReason::Timeout(_) | InconclusiveReason::MalformedReply(_),
            ) => self.send(&Quit.to_string(), SmtpStage::Quit).await,
            _ => self.command(Quit, SmtpStage::Quit).await.map(|_| ()),
        };
        if let Err(reason) = result {
            tracing::debug!(target: "smtp_task",
                "QUIT to {} failed (ignored): {}", self.host, reason);
        }
        let _ = timeout(self.timeout, self.stream.get_mut().shutdown()).await;
    }
}

/// Builds a [`Reply`] from the lines of one server reply, terminators stripped.
fn parse_reply(lines: &[String]) -> Option<Reply> {
    let last = lines.last()?;

    // A final line holding only the code is legal but lettre's parser rejects it.
    if last.len() == 3 && last.bytes().all(|b| b.is_ascii_digit()) {
        let code = last.parse::<u16>().ok()?;
        let text = lines[..lines.len() - 1]
            .iter()
            .filter_map(|l| l.get(4..))
            .collect::<Vec<&str>>()
            .join(" ");
        return Some(Reply { code, text });
    }

    let mut raw = lines.join("\r\n");
    raw.push_str("\r\n");
    let response = Response::from_str(&raw).ok()?;
    let code = response.code().to_string().parse::<u16>().ok()?;
    let text = response.message().collect::<Vec<&str>>().join(" ");
    Some(Reply { code, text })
}

/// Probes one MX host for one recipient.
#[derive(Debug, Clone)]
pub struct MailboxProbe {
    sender: Address,
    helo_name: String,
    port: u16,
    timeout: Duration,
}

impl MailboxProbe {
    pub fn new(config: &Config) -> Result<Self> {
        let sender = Address::from_str(&config.smtp_sender_email)
            .map_err(|e| AppError::Config(format!("Invalid sender email in config: {}", e)))?;
        Ok(Self {
            sender,
            helo_name: config.smtp_helo_name.clone(),
            port: config.smtp_port,
            timeout: config.smtp_timeout,
        })
    }

    /// Runs one session against `mail_server`.
    ///
    /// Dropping the returned future drops the socket, so a cancelled probe
    /// leaves no connection behind.
    pub async fn probe(&self, mail_server: &str, recipient: &Address) -> ProbeReport {
        tracing::debug!(target: "smtp_task",
            "Starting SMTP check for {} via {}:{}", recipient, mail_server, self.port);

        let mut session = match SmtpSession::connect(mail_server, self.port, self.timeout).await {
            Ok(session) => session,
            Err(reason) => {
                tracing::info!(target: "smtp_task", "SMTP connection to {} failed: {}", mail_server, reason);
                return ProbeReport::inconclusive(Some(mail_server), reason, None);
            }
        };

        let report = match self.run(&mut session, mail_server, recipient).await {
            Ok(report) => report,
            Err(aborted) => {
                tracing::info!(target: "smtp_task",
                    "SMTP check for <{}> on {} inconclusive: {}", recipient, mail_server, aborted.reason);
                ProbeReport::inconclusive(Some(mail_server), aborted.reason, aborted.reply)
            }
        };

        session.quit(&report.outcome).await;

        tracing::info!(target: "smtp_task",
            "SMTP result for <{}> via {}: {:?} ('{}')",
            recipient, mail_server, report.outcome, report.response
        );
        report
    }

    async fn run(
        &self,
        session: &mut SmtpSession,
        mail_server: &str,
        recipient: &Address,
    ) -> std::result::Result<ProbeReport, Aborted> {
        let greeting = session.read_reply(SmtpStage::Greeting).await?;
        if greeting.code != 220 {
            return Err(Aborted::with_reply(
                InconclusiveReason::GreetingRejected(greeting.code),
                &greeting,
            ));
        }

        let ehlo = session
            .command(Ehlo::new(ClientId::Domain(self.helo_name.clone())), SmtpStage::Helo)
            .await?;
        if !ehlo.is_positive() {
            tracing::debug!(target: "smtp_task", "EHLO rejected by {} ({}), falling back to HELO", mail_server, ehlo);
            let helo = session
                .command(format!("HELO {}\r\n", self.helo_name), SmtpStage::Helo)
                .await?;
            if !helo.is_positive() {
                return Err(Aborted::with_reply(
                    InconclusiveReason::HeloRejected(helo.code),
                    &helo,
                ));
            }
        }

        let mail = session
            .command(Mail::new(Some(self.sender.clone()), vec![]), SmtpStage::MailFrom)
            .await?;
        if !matches!(mail.code, 250 | 251) {
            tracing::warn!(target: "smtp_task",
                "SMTP sender '{}' rejected by {}: {}", self.sender, mail_server, mail);
            return Err(Aborted::with_reply(
                InconclusiveReason::SenderRejected(mail.code),
                &mail,
            ));
        }

        let rcpt = session
            .command(Rcpt::new(recipient.clone(), vec![]), SmtpStage::RcptTo)
            .await?;
        tracing::info!(target: "smtp_task",
            "RCPT TO:<{}> response from {}: {}", recipient, mail_server, rcpt);

        let mut outcome = classify_rcpt(&rcpt);
        if let ProbeOutcome::Exists { catch_all } = &mut outcome {
            *catch_all = self.detect_catch_all(session, recipient, mail_server).await;
        }

        Ok(ProbeReport::new(mail_server, outcome, rcpt.to_string()))
    }

    /// Sends a second RCPT TO for a fabricated local part in the same session.
    async fn detect_catch_all(
        &self,
        session: &mut SmtpSession,
        recipient: &Address,
        mail_server: &str,
    ) -> bool {
        let fabricated = match Address::new(fabricated_local_part(), recipient.domain()) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::error!(target: "smtp_task", "Failed to build catch-all probe address: {}", e);
                return false;
            }
        };

        tracing::debug!(target: "smtp_task", "Performing catch-all check with RCPT TO:<{}> on {}", fabricated, mail_server);
        match session.command(Rcpt::new(fabricated, vec![]), SmtpStage::RcptTo).await {
            Ok(reply) if matches!(reply.code, 250 | 251) => {
                tracing::warn!(target: "smtp_task",
                    "Domain {} (MX: {}) appears to be a catch-all ({})", recipient.domain(), mail_server, reply);
                true
            }
            Ok(reply) => {
                tracing::debug!(target: "smtp_task",
                    "Catch-all check negative for {} (MX: {}): {}", recipient.domain(), mail_server, reply);
                false
            }
            Err(reason) => {
                tracing::warn!(target: "smtp_task",
                    "Catch-all check on {} failed (ignoring): {}", mail_server, reason);
                false
            }
        }
    }
}

fn fabricated_local_part() -> String {
    let mut rng = rand::thread_rng();
    format!(
        "no-reply-does-not-exist-{}-{:x}",
        rng.gen_range(10000..99999),
        rng.gen::<u32>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::smtp::testing::{self, is_fabricated};
    use std::time::Instant;
    use tokio::io::BufReader;
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    fn probe_for(port: u16, timeout: Duration) -> MailboxProbe {
        let config = Config {
            smtp_port: port,
            smtp_timeout: timeout,
            ..Config::default()
        };
        MailboxProbe::new(&config).unwrap()
    }

    fn recipient() -> Address {
        Address::from_str("user@example.com").unwrap()
    }

    fn reply(code: u16, text: &str) -> Reply {
        Reply {
            code,
            text: text.to_string(),
        }
    }

    #[test]
    fn rcpt_code_table() {
        let exists = ProbeOutcome::Exists { catch_all: false };
        assert_eq!(classify_rcpt(&reply(250, "2.1.5 OK")), exists);
        assert_eq!(classify_rcpt(&reply(251, "will forward")), exists);
        assert_eq!(classify_rcpt(&reply(451, "try later")), exists);
        assert_eq!(classify_rcpt(&reply(452, "over quota")), exists);
        assert_eq!(classify_rcpt(&reply(252, "cannot verify")), exists);
        assert_eq!(classify_rcpt(&reply(550, "5.1.1 User unknown")), ProbeOutcome::Absent);
        assert_eq!(
            classify_rcpt(&reply(550, "5.7.1 Rejected by policy")),
            ProbeOutcome::Inconclusive(InconclusiveReason::AmbiguousRejection(550))
        );
        assert_eq!(
            classify_rcpt(&reply(554, "transaction failed")),
            ProbeOutcome::Inconclusive(InconclusiveReason::UnexpectedReply(554))
        );
        assert_eq!(
            classify_rcpt(&reply(421, "service not available")),
            ProbeOutcome::Inconclusive(InconclusiveReason::UnexpectedReply(421))
        );
    }

    #[test]
    fn phrases_override_codes() {
        assert_eq!(classify_rcpt(&reply(250, "but No Such User here")), ProbeOutcome::Absent);
        assert_eq!(classify_rcpt(&reply(450, "4.2.1 Mailbox unavailable")), ProbeOutcome::Absent);
        assert_eq!(classify_rcpt(&reply(554, "Recipient rejected")), ProbeOutcome::Absent);
    }

    #[test]
    fn fabricated_addresses_are_valid_and_distinct() {
        let a = fabricated_local_part();
        let b = fabricated_local_part();
        assert!(Address::new(a.clone(), "example.com").is_ok());
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn accepted_mailbox_without_catch_all() {
        let server = testing::spawn_rcpt("127.0.0.1:0", |line| {
            if is_fabricated(line) {
                "550 5.1.1 User unknown".into()
            } else {
                "250 2.1.5 OK".into()
            }
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(report.outcome, ProbeOutcome::Exists { catch_all: false });
        assert_eq!(report.response, "250 2.1.5 OK");
        assert_eq!(report.host.as_deref(), Some("127.0.0.1"));

        let lines = server.lines();
        assert_eq!(lines[0], "EHLO localhost");
        assert_eq!(lines[1], "MAIL FROM:<verify-probe@example.com>");
        assert_eq!(lines[2], "RCPT TO:<user@example.com>");
        assert!(is_fabricated(&lines[3]));
        assert!(lines[3].ends_with("@example.com>"));
        assert_eq!(lines.last().map(String::as_str), Some("QUIT"));
        assert!(!lines.iter().any(|l| l.starts_with("DATA")));
    }

    #[tokio::test]
    async fn catch_all_detected_in_same_session() {
        let server = testing::spawn_rcpt("127.0.0.1:0", |_| "250 2.1.5 OK".into()).await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(report.outcome, ProbeOutcome::Exists { catch_all: true });
        assert_eq!(server.connection_count(), 1);
        let rcpts = server.lines().iter().filter(|l| l.starts_with("RCPT TO")).count();
        assert_eq!(rcpts, 2);
    }

    #[tokio::test]
    async fn unknown_user_is_absent_and_skips_catch_all() {
        let server = testing::spawn_rcpt("127.0.0.1:0", |_| {
            "550 5.1.1 <user@example.com>: Recipient address rejected: User unknown".into()
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(report.outcome, ProbeOutcome::Absent);
        assert_eq!(report.outcome.is_catch_all(), Some(false));
        assert!(report.response.starts_with("550 "));
        let rcpts = server.lines().iter().filter(|l| l.starts_with("RCPT TO")).count();
        assert_eq!(rcpts, 1);
    }

    #[tokio::test]
    async fn bare_550_is_inconclusive() {
        let server =
            testing::spawn_rcpt("127.0.0.1:0", |_| "550 5.7.1 Rejected by policy".into()).await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::AmbiguousRejection(550))
        );
        assert_eq!(report.response, "550 5.7.1 Rejected by policy");
    }

    #[tokio::test]
    async fn falls_back_to_helo() {
        let server = testing::spawn("127.0.0.1:0", Some("220 old.test SMTP"), |line| {
            let reply = if line.starts_with("EHLO") {
                "502 5.5.2 EHLO not supported"
            } else {
                "250 OK"
            };
            Some(reply.to_string())
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(report.outcome, ProbeOutcome::Exists { catch_all: true });
        assert_eq!(server.lines()[1], "HELO localhost");
    }

    #[tokio::test]
    async fn rejected_sender_still_quits() {
        let server = testing::spawn("127.0.0.1:0", Some("220 mx.test"), |line| {
            let reply = if line.starts_with("MAIL") {
                "553 5.7.1 Sender address rejected"
            } else {
                "250 OK"
            };
            Some(reply.to_string())
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::SenderRejected(553))
        );
        assert!(!report.outcome.is_retryable());
        assert_eq!(report.response, "553 5.7.1 Sender address rejected");
        assert_eq!(server.lines().last().map(String::as_str), Some("QUIT"));
    }

    #[tokio::test]
    async fn rejected_greeting() {
        let server =
            testing::spawn("127.0.0.1:0", Some("554 5.3.2 too busy"), |_| Some("250 OK".into()))
                .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::GreetingRejected(554))
        );
        assert!(report.outcome.is_retryable());
    }

    #[tokio::test]
    async fn malformed_greeting() {
        let greeting = Some("HTTP/1.1 400 Bad Request");
        let server = testing::spawn("127.0.0.1:0", greeting, |_| Some("250 OK".into())).await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::MalformedReply(SmtpStage::Greeting))
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let server = testing::spawn("127.0.0.1:0", None, |_| None).await;

        let report = probe_for(server.addr.port(), Duration::from_millis(200))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::Timeout(SmtpStage::Greeting))
        );
    }

    #[tokio::test]
    async fn disconnect_mid_session() {
        let server = testing::spawn("127.0.0.1:0", Some("220 mx.test"), |line| {
            if line.starts_with("RCPT") {
                None
            } else {
                Some("250 OK".into())
            }
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::Disconnected(SmtpStage::RcptTo))
        );
    }

    #[tokio::test]
    async fn refused_connection() {
        let port = testing::closed_port().await;

        let report = probe_for(port, Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::ConnectionRefused)
        );
        assert_eq!(report.response, "Connection refused by mail server");
    }

    #[tokio::test]
    async fn unresolvable_host() {
        let report = probe_for(25, Duration::from_secs(2))
            .probe("mx.does-not-exist.invalid", &recipient())
            .await;

        assert!(matches!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::HostUnresolvable(_))
                | ProbeOutcome::Inconclusive(InconclusiveReason::Timeout(SmtpStage::Connect))
        ));
        assert!(report.outcome.is_retryable());
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn parses_code_only_replies() {
        assert_eq!(parse_reply(&lines(&["250"])), Some(reply(250, "")));
        assert_eq!(
            parse_reply(&lines(&["250-mx.test", "250-PIPELINING", "250"])),
            Some(reply(250, "mx.test PIPELINING"))
        );
        assert_eq!(
            parse_reply(&lines(&["550 5.1.1 User unknown"])),
            Some(reply(550, "5.1.1 User unknown"))
        );
        assert_eq!(parse_reply(&lines(&["25"])), None);
        assert_eq!(parse_reply(&lines(&["abc"])), None);
    }

    #[tokio::test]
    async fn code_only_replies_are_understood() {
        let server = testing::spawn("127.0.0.1:0", Some("220"), |line| {
            let reply = if is_fabricated(line) { "550 5.1.1 User unknown" } else { "250" };
            Some(reply.to_string())
        })
        .await;

        let report = probe_for(server.addr.port(), Duration::from_secs(2))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(report.outcome, ProbeOutcome::Exists { catch_all: false });
        assert_eq!(report.response, "250");
    }

    #[tokio::test]
    async fn endless_reply_line_is_cut_off() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let chunk = vec![b'A'; 64 * 1024];
            if socket.write_all(b"220").await.is_err() {
                return;
            }
            while socket.write_all(&chunk).await.is_ok() {}
        });

        let report = probe_for(port, Duration::from_secs(10))
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::MalformedReply(SmtpStage::Greeting))
        );
    }

    #[tokio::test]
    async fn timed_out_session_does_not_wait_again_on_quit() {
        let server = testing::spawn("127.0.0.1:0", None, |_| None).await;
        let limit = Duration::from_millis(500);

        let started = Instant::now();
        let report = probe_for(server.addr.port(), limit)
            .probe("127.0.0.1", &recipient())
            .await;

        assert_eq!(
            report.outcome,
            ProbeOutcome::Inconclusive(InconclusiveReason::Timeout(SmtpStage::Greeting))
        );
        assert!(started.elapsed() < limit + Duration::from_millis(400));
    }

    /// Greets one client, then stops answering once EHLO arrives. `stalled`
    /// fires at that point; the handle yields what the next read returned.
    async fn stalling_server() -> (u16, oneshot::Receiver<()>, JoinHandle<usize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (stalled_tx, stalled_rx) = oneshot::channel();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            write_half.write_all(b"220 mx.test ESMTP\r\n").await.unwrap();

            let mut reader = BufReader::new(read_half);
            let mut line = String::new();
            reader.read_line(&mut line).await.unwrap();
            assert!(line.starts_with("EHLO"));
            let _ = stalled_tx.send(());

            line.clear();
            let after = reader.read_line(&mut line).await.unwrap_or(0);
            drop(write_half);
            after
        });

        (port, stalled_rx, server)
    }

    #[tokio::test]
    async fn aborted_check_closes_its_connection() {
        let (port, stalled, server) = stalling_server().await;
        let probe = probe_for(port, Duration::from_secs(30));

        let task = tokio::spawn(async move { probe.probe("127.0.0.1", &recipient()).await });
        stalled.await.unwrap();
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        let read = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server never saw the connection close")
            .unwrap();
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn dropped_check_future_closes_its_connection() {
        let (port, _stalled, server) = stalling_server().await;
        let probe = probe_for(port, Duration::from_secs(30));

        let cut_short =
            tokio::time::timeout(Duration::from_millis(300), probe.probe("127.0.0.1", &recipient()))
                .await;
        assert!(cut_short.is_err());

        let read = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server never saw the connection close")
            .unwrap();
        assert_eq!(read, 0);
    }
}
