pub mod client;
pub mod error;
pub mod result;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ProbeOrchestrator;
pub use result::{InconclusiveReason, ProbeOutcome, ProbeReport, SmtpStage};
pub use session::MailboxProbe;
