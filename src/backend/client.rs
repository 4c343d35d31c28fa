//! `ZeroMQ` REQ client for the inference server.
//!
//! The server speaks strict request/reply: every message the client sends
//! is answered by exactly one reply. Both directions of an exchange are
//! bounded by the configured timeout. A timed-out REQ socket is stuck in a
//! half-completed exchange and cannot be reused; the caller is expected to
//! drop the client and reconnect.
//!
//! Wire format is one JSON object per `ZeroMQ` message:
//!
//! | request                          | reply                                |
//! |----------------------------------|--------------------------------------|
//! | `{"type":"reset"}`               | `{"status":"ok"}`                    |
//! | `{"type":"predict","image":{…}}` | `{"status":"ok","pred":{…}}`         |
//! | *(either)*                       | `{"status":"error","error":"…"}`     |

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeromq::{Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::backend::frame::Frame;
use crate::{AppError, Result};

/// Number of button activations in a prediction.
pub const BUTTON_COUNT: usize = 21;

/// Outbound backend request (sidecar → server).
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerRequest<'a> {
    /// Session initialization handshake.
    Reset,
    /// Prediction request for one prepared frame.
    Predict {
        /// The frame to run inference on.
        image: &'a Frame,
    },
}

/// Inbound backend reply envelope (server → sidecar).
#[derive(Debug, Deserialize)]
struct ServerReply {
    /// `"ok"` or `"error"`.
    status: String,
    /// Failure description when `status` is `"error"`.
    #[serde(default)]
    error: Option<String>,
    /// Prediction payload when `status` is `"ok"` on a predict exchange.
    #[serde(default)]
    pred: Option<RawPrediction>,
}

/// Prediction payload as the server ships it: batched rows per output head.
#[derive(Debug, Default, Deserialize)]
struct RawPrediction {
    #[serde(default)]
    j_left: Vec<Vec<f32>>,
    #[serde(default)]
    j_right: Vec<Vec<f32>>,
    #[serde(default)]
    buttons: Vec<Vec<f32>>,
}

/// One gamepad prediction: stick deflections and button activations.
///
/// The server replies with batched arrays; this is row 0 of each head,
/// zero-filled when a head is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Left stick `[x, y]`.
    pub j_left: Vec<f32>,
    /// Right stick `[x, y]`.
    pub j_right: Vec<f32>,
    /// Button activations ([`BUTTON_COUNT`] values).
    pub buttons: Vec<f32>,
}

impl From<RawPrediction> for Prediction {
    fn from(raw: RawPrediction) -> Self {
        Self {
            j_left: first_row(raw.j_left, 2),
            j_right: first_row(raw.j_right, 2),
            buttons: first_row(raw.buttons, BUTTON_COUNT),
        }
    }
}

/// Take row 0 of a batched head, or a zero vector of `len` when absent.
fn first_row(mut rows: Vec<Vec<f32>>, len: usize) -> Vec<f32> {
    if rows.is_empty() {
        vec![0.0; len]
    } else {
        rows.swap_remove(0)
    }
}

/// Open REQ connection to the inference server.
pub struct BackendClient {
    socket: zeromq::ReqSocket,
    timeout: Duration,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    /// Connect to the server at `addr` and run the `reset` handshake.
    ///
    /// # Errors
    ///
    /// - [`AppError::Timeout`] if the connection or the handshake exchange
    ///   does not complete within `timeout`.
    /// - [`AppError::Io`] if the transport fails during the handshake.
    /// - [`AppError::Backend`] if the connection attempt fails or the
    ///   server refuses the reset.
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let mut socket = zeromq::ReqSocket::new();

        tokio::time::timeout(timeout, socket.connect(addr))
            .await
            .map_err(|_| AppError::Timeout(format!("connect to {addr} timed out")))?
            .map_err(|e| AppError::Backend(format!("connect to {addr} failed: {e}")))?;

        let mut client = Self { socket, timeout };

        let reply = client.exchange(&ServerRequest::Reset).await?;
        if reply.status == "ok" {
            debug!(addr, "backend session initialized");
            Ok(client)
        } else {
            Err(AppError::Backend(
                reply
                    .error
                    .unwrap_or_else(|| "server refused session reset".into()),
            ))
        }
    }

    /// Run one predict exchange for a prepared frame.
    ///
    /// # Errors
    ///
    /// - [`AppError::Timeout`] if the server does not reply in time; the
    ///   socket is unusable afterwards and the client must be dropped.
    /// - [`AppError::Io`] if the transport fails mid-exchange; the socket
    ///   is likewise unusable afterwards.
    /// - [`AppError::Backend`] for undecodable replies and server-reported
    ///   errors, which leave the socket usable.
    pub async fn predict(&mut self, frame: &Frame) -> Result<Prediction> {
        let reply = self.exchange(&ServerRequest::Predict { image: frame }).await?;

        if reply.status == "ok" {
            Ok(reply.pred.unwrap_or_default().into())
        } else {
            Err(AppError::Backend(
                reply.error.unwrap_or_else(|| "unknown server error".into()),
            ))
        }
    }

    /// Close the socket, ignoring teardown failures.
    pub async fn close(self) {
        self.socket.close().await;
    }

    /// One request/reply exchange, both directions bounded by the timeout.
    async fn exchange(&mut self, request: &ServerRequest<'_>) -> Result<ServerReply> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| AppError::Backend(format!("failed to serialize request: {e}")))?;

        // Transport failures mid-exchange leave the REQ socket stuck, so
        // they map to `Io` and the session drops the connection, same as a
        // timeout. Server-reported errors complete the exchange and map to
        // `Backend`, which keeps the socket usable.
        let message = ZmqMessage::from(bytes::Bytes::from(payload));
        tokio::time::timeout(self.timeout, self.socket.send(message))
            .await
            .map_err(|_| AppError::Timeout("server timeout".into()))?
            .map_err(|e| AppError::Io(format!("send failed: {e}")))?;

        let reply = tokio::time::timeout(self.timeout, self.socket.recv())
            .await
            .map_err(|_| AppError::Timeout("server timeout".into()))?
            .map_err(|e| AppError::Io(format!("receive failed: {e}")))?;

        let bytes = reply
            .get(0)
            .ok_or_else(|| AppError::Backend("empty reply from server".into()))?;

        serde_json::from_slice(bytes)
            .map_err(|e| AppError::Backend(format!("undecodable reply from server: {e}")))
    }
}
