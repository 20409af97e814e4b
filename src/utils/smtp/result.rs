//! Defines the result types for SMTP mailbox probes.

use std::fmt;

/// The protocol step a probe was in when something went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for SmtpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SmtpStage::Connect => "connect",
            SmtpStage::Greeting => "greeting",
            SmtpStage::Helo => "EHLO/HELO",
            SmtpStage::MailFrom => "MAIL FROM",
            SmtpStage::RcptTo => "RCPT TO",
            SmtpStage::Quit => "QUIT",
        };
        f.write_str(s)
    }
}

/// Why a probe could not reach a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// No MX hosts were available to probe.
    NoMailServers,
    /// The recipient could not be expressed as an SMTP address.
    InvalidRecipient(String),
    /// The MX host name did not resolve to any address.
    HostUnresolvable(String),
    ConnectionRefused,
    ConnectFailed(String),
    Timeout(SmtpStage),
    Disconnected(SmtpStage),
    MalformedReply(SmtpStage),
    GreetingRejected(u16),
    HeloRejected(u16),
    SenderRejected(u16),
    /// 550/551/553 without any wording that says the mailbox is missing.
    AmbiguousRejection(u16),
    UnexpectedReply(u16),
    Io(String),
}

impl InconclusiveReason {
    /// Transport-level failures that another MX host might not share.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InconclusiveReason::HostUnresolvable(_)
                | InconclusiveReason::ConnectionRefused
                | InconclusiveReason::ConnectFailed(_)
                | InconclusiveReason::Timeout(_)
                | InconclusiveReason::Disconnected(_)
                | InconclusiveReason::MalformedReply(_)
                | InconclusiveReason::GreetingRejected(_)
                | InconclusiveReason::Io(_)
        )
    }
}

impl fmt::Display for InconclusiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InconclusiveReason::NoMailServers => write!(f, "No MX records to probe"),
            InconclusiveReason::InvalidRecipient(e) => write!(f, "Invalid recipient: {}", e),
            InconclusiveReason::HostUnresolvable(host) => {
                write!(f, "Could not resolve mail server address: {}", host)
            }
            InconclusiveReason::ConnectionRefused => write!(f, "Connection refused by mail server"),
            InconclusiveReason::ConnectFailed(e) => write!(f, "Connection error: {}", e),
            InconclusiveReason::Timeout(stage) => write!(f, "Timeout during {}", stage),
            InconclusiveReason::Disconnected(stage) => {
                write!(f, "Server disconnected unexpectedly during {}", stage)
            }
            InconclusiveReason::MalformedReply(stage) => {
                write!(f, "Malformed server reply during {}", stage)
            }
            InconclusiveReason::GreetingRejected(code) => write!(f, "Greeting rejected: {}", code),
            InconclusiveReason::HeloRejected(code) => write!(f, "EHLO/HELO rejected: {}", code),
            InconclusiveReason::SenderRejected(code) => write!(f, "MAIL FROM rejected: {}", code),
            InconclusiveReason::AmbiguousRejection(code) => {
                write!(f, "Recipient rejected without reason: {}", code)
            }
            InconclusiveReason::UnexpectedReply(code) => {
                write!(f, "Unexpected RCPT TO reply: {}", code)
            }
            InconclusiveReason::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

/// Represents the verdict of probing one mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server did not refuse the recipient. `catch_all` is set when a
    /// fabricated address at the same domain was accepted too.
    Exists { catch_all: bool },
    Absent,
    Inconclusive(InconclusiveReason),
}

impl ProbeOutcome {
    /// Tri-state mailbox existence: `None` when inconclusive.
    pub fn mailbox_exists(&self) -> Option<bool> {
        match self {
            ProbeOutcome::Exists { .. } => Some(true),
            ProbeOutcome::Absent => Some(false),
            ProbeOutcome::Inconclusive(_) => None,
        }
    }

    /// Tri-state catch-all flag: `None` when inconclusive.
    pub fn is_catch_all(&self) -> Option<bool> {
        match self {
            ProbeOutcome::Exists { catch_all } => Some(*catch_all),
            ProbeOutcome::Absent => Some(false),
            ProbeOutcome::Inconclusive(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeOutcome::Inconclusive(reason) if reason.is_retryable())
    }
}

/// A probe outcome together with where it came from and what the server said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// The MX host that produced this outcome, if any was contacted.
    pub host: Option<String>,
    pub outcome: ProbeOutcome,
    /// Server reply text (`"250 2.1.5 OK"`) or a description of the failure.
    pub response: String,
}

impl ProbeReport {
    pub fn new(host: &str, outcome: ProbeOutcome, response: String) -> Self {
        Self {
            host: Some(host.to_string()),
            outcome,
            response,
        }
    }

    pub fn inconclusive(
        host: Option<&str>,
        reason: InconclusiveReason,
        response: Option<String>,
    ) -> Self {
        let response = response.unwrap_or_else(|| reason.to_string());
        Self {
            host: host.map(str::to_string),
            outcome: ProbeOutcome::Inconclusive(reason),
            response,
        }
    }
}
