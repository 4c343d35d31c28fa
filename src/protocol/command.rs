//! Inbound command parsing.
//!
//! Each stdin line is a JSON object with a `type` field naming the command.
//! Known commands:
//!
//! | `type`       | extra fields                     |
//! |--------------|----------------------------------|
//! | `connect`    | `addr` (optional endpoint)       |
//! | `predict`    | `image` (base64-encoded payload) |
//! | `disconnect` | —                                |
//! | `ping`       | —                                |
//! | `quit`       | —                                |
//!
//! Any other `type` value is preserved as [`Command::Unknown`] so the
//! dispatcher can report it back to the host.

use serde::Deserialize;

use crate::{AppError, Result};

/// Inbound command envelope (host → sidecar).
#[derive(Debug, Deserialize)]
struct CommandEnvelope {
    /// Command type identifier.
    #[serde(rename = "type", default)]
    kind: String,
    /// Endpoint override for `connect`.
    addr: Option<String>,
    /// Base64 image payload for `predict`.
    image: Option<String>,
}

/// A parsed command from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the backend connection, optionally to a new endpoint.
    Connect {
        /// Endpoint override; `None` keeps the current server address.
        addr: Option<String>,
    },
    /// Request a prediction for one base64-encoded image.
    Predict {
        /// Base64-encoded image payload. Absent field decodes as empty.
        image: String,
    },
    /// Close the backend connection.
    Disconnect,
    /// Report liveness and connection state.
    Ping,
    /// Disconnect and terminate the main loop.
    Quit,
    /// Unrecognized command type, echoed back in the error response.
    Unknown(String),
}

impl Command {
    /// Stable command name for logging; payloads are never logged.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Predict { .. } => "predict",
            Self::Disconnect => "disconnect",
            Self::Ping => "ping",
            Self::Quit => "quit",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Parse a single stdin line into a [`Command`].
///
/// # Return value
///
/// - `Ok(Some(command))` — the line is a JSON object with a `type` field
///   (unrecognized types yield [`Command::Unknown`]).
/// - `Ok(None)` — the line is empty or whitespace-only.
/// - `Err(AppError::Protocol("invalid json: …"))` — the line is not valid
///   JSON or not an object.
///
/// # Errors
///
/// Returns [`AppError::Protocol`] for malformed input; the caller reports
/// the message to the host and keeps the loop running.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let envelope: CommandEnvelope = serde_json::from_str(line)
        .map_err(|e| AppError::Protocol(format!("invalid json: {e}")))?;

    let command = match envelope.kind.as_str() {
        "connect" => Command::Connect {
            addr: envelope.addr,
        },
        "predict" => Command::Predict {
            image: envelope.image.unwrap_or_default(),
        },
        "disconnect" => Command::Disconnect,
        "ping" => Command::Ping,
        "quit" => Command::Quit,
        other => Command::Unknown(other.to_owned()),
    };

    Ok(Some(command))
}
