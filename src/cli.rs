//! Command-line arguments for the `mailprobe` binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mailprobe", version)]
#[command(about = "Estimate how deliverable email addresses are")]
pub struct Cli {
    /// Addresses to validate. Read from --input when omitted.
    #[arg(value_name = "ADDRESS")]
    pub addresses: Vec<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, env = "MAILPROBE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ask each domain's mail server whether the mailbox exists
    #[arg(long)]
    pub smtp: bool,

    /// Envelope sender used for MAIL FROM
    #[arg(long, value_name = "ADDR", env = "MAILPROBE_SENDER")]
    pub sender: Option<String>,

    /// Per-step SMTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub smtp_timeout: Option<u64>,

    /// Maximum addresses validated at once
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Replacement disposable domain list, one domain per line
    #[arg(long, value_name = "FILE")]
    pub disposable_list: Option<PathBuf>,

    /// File with one address per line
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write JSON results here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
