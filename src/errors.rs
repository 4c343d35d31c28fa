//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Stdio wire-protocol failure: bad framing or malformed command JSON.
    Protocol(String),
    /// `ZeroMQ` transport or inference-server failure.
    Backend(String),
    /// Image payload decode or resize failure.
    Frame(String),
    /// The inference server did not reply within the configured timeout.
    Timeout(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Backend(msg) => write!(f, "backend: {msg}"),
            Self::Frame(msg) => write!(f, "frame: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
