//! Defines the custom error types for the mailprobe engine.
//!
//! Per-address failures (bad syntax, missing MX, SMTP trouble) are *not*
//! errors; they are folded into the `ValidationResult`. Only configuration
//! and infrastructure problems surface as `AppError`.

use std::io;
use thiserror::Error;

/// The primary error type for the validation engine.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error occurring during configuration loading or validation.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error initializing necessary components (e.g., resolvers).
    #[error("Initialization Error: {0}")]
    Initialization(String),

    /// Error related to file input/output operations.
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing the TOML configuration file.
    #[error("TOML Error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The disposable domain data set could not be loaded.
    #[error("Disposable Domain List Error: {0}")]
    DisposableList(String),

    /// No DNS server could be reached at all. This says nothing about the
    /// address being validated.
    #[error("DNS Resolver Unavailable: {0}")]
    ResolverUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
