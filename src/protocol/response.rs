//! Outbound response types.
//!
//! Every response is one JSON object on one stdout line, tagged by `type`.
//! The shapes are fixed; the host matches on `type` and, for predictions,
//! on the presence of an `error` field.

use serde::Serialize;

use crate::backend::Prediction;

/// Outbound response envelope (sidecar → host).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    /// Emitted once at startup, before the first command is read.
    Ready,
    /// The backend connection is open.
    Connected {
        /// Human-readable confirmation.
        message: String,
    },
    /// The backend connection is closed.
    Disconnected,
    /// Liveness reply.
    Pong {
        /// Whether a backend connection is currently open.
        connected: bool,
    },
    /// Prediction result or per-request failure.
    Prediction(PredictionResult),
    /// Generic failure: malformed input, unknown command, connect failure.
    Error {
        /// Failure description for the host.
        message: String,
    },
}

/// Body of a `prediction` response.
///
/// A failed request keeps the `prediction` envelope and carries the failure
/// in an `error` field, which is what the host expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionResult {
    /// Successful prediction: stick deflections and button activations.
    Ok {
        /// Left stick `[x, y]`.
        j_left: Vec<f32>,
        /// Right stick `[x, y]`.
        j_right: Vec<f32>,
        /// Button activations (21 values).
        buttons: Vec<f32>,
    },
    /// Per-request failure description.
    Err {
        /// Failure description for the host.
        error: String,
    },
}

impl From<Prediction> for PredictionResult {
    fn from(pred: Prediction) -> Self {
        Self::Ok {
            j_left: pred.j_left,
            j_right: pred.j_right,
            buttons: pred.buttons,
        }
    }
}

impl Response {
    /// Build an `error` response from anything displayable.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Build a failed `prediction` response.
    #[must_use]
    pub fn prediction_error(error: impl Into<String>) -> Self {
        Self::Prediction(PredictionResult::Err {
            error: error.into(),
        })
    }
}
