//! Maps socket-level failures onto [`InconclusiveReason`]s.

use super::result::{InconclusiveReason, SmtpStage};
use std::io;

/// Classifies an I/O error raised while talking to `mail_server`.
pub fn handle_io_error(err: &io::Error, stage: SmtpStage, mail_server: &str) -> InconclusiveReason {
    let reason = match err.kind() {
        io::ErrorKind::ConnectionRefused => InconclusiveReason::ConnectionRefused,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => InconclusiveReason::Timeout(stage),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotConnected => InconclusiveReason::Disconnected(stage),
        _ if stage == SmtpStage::Connect => InconclusiveReason::ConnectFailed(err.to_string()),
        _ => InconclusiveReason::Io(err.to_string()),
    };

    if stage == SmtpStage::Connect {
        tracing::warn!(target: "smtp_task",
            "Connection to {} failed: {}. Outbound port 25 may be blocked by an ISP or firewall.",
            mail_server, err
        );
    } else {
        tracing::warn!(target: "smtp_task", "I/O error during {} with {}: {}", stage, mail_server, err);
    }
    reason
}
