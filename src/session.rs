//! Sidecar session: command dispatch and the stdio main loop.
//!
//! One [`Session`] lives for the whole process. It owns the server address,
//! the optional open [`BackendClient`], and nothing else. The invariant is
//! simple: the client handle is present exactly when the session is
//! connected.
//!
//! The loop reads one command per stdin line, dispatches it, and writes one
//! response per stdout line. Failures never terminate the loop; only `quit`
//! or stdin EOF do.

use futures_util::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::backend::{prepare_frame, BackendClient};
use crate::config::Settings;
use crate::protocol::{parse_command, Command, InboundLine, Response, WireCodec};
use crate::{AppError, Result};

/// Result of dispatching one command.
#[derive(Debug)]
pub enum Outcome {
    /// Write this response and keep reading.
    Reply(Response),
    /// Terminate the main loop.
    Shutdown,
}

/// Process-lifetime session state.
#[derive(Debug)]
pub struct Session {
    settings: Settings,
    server_addr: String,
    backend: Option<BackendClient>,
}

impl Session {
    /// Create a disconnected session from validated settings.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let server_addr = settings.server_addr.clone();
        Self {
            settings,
            server_addr,
            backend: None,
        }
    }

    /// Whether a backend connection is currently open.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Dispatch one parsed command.
    ///
    /// Every failure is converted into a response here; this function never
    /// returns an error, so the caller's loop cannot be torn down by a bad
    /// command or a misbehaving server.
    pub async fn dispatch(&mut self, command: Command) -> Outcome {
        match command {
            Command::Connect { addr } => Outcome::Reply(self.handle_connect(addr).await),
            Command::Predict { image } => Outcome::Reply(self.handle_predict(&image).await),
            Command::Disconnect => {
                self.teardown().await;
                Outcome::Reply(Response::Disconnected)
            }
            Command::Ping => Outcome::Reply(Response::Pong {
                connected: self.connected(),
            }),
            Command::Quit => {
                self.teardown().await;
                Outcome::Shutdown
            }
            Command::Unknown(kind) => {
                Outcome::Reply(Response::error(format!("unknown command: {kind}")))
            }
        }
    }

    /// Run the main loop over arbitrary byte streams until `quit` or EOF.
    ///
    /// Emits `ready` before reading the first command. Oversized lines and
    /// malformed JSON produce `error` responses and the loop continues; an
    /// I/O error on either stream stops it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if writing a response fails.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let codec = WireCodec::with_max_length(self.settings.max_line_bytes);
        let mut commands = FramedRead::new(input, codec);

        write_line(&mut output, &Response::Ready).await?;
        info!(addr = %self.server_addr, "sidecar ready");

        while let Some(item) = commands.next().await {
            let line = match item {
                Ok(InboundLine::Complete(line)) => line,
                Ok(InboundLine::Oversized) => {
                    warn!("oversized command line, skipping");
                    let message = format!(
                        "line too long: exceeded {} bytes",
                        self.settings.max_line_bytes
                    );
                    write_line(&mut output, &Response::error(message)).await?;
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, "input stream error, stopping");
                    break;
                }
            };

            let command = match parse_command(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(err) => {
                    write_line(&mut output, &Response::error(wire_message(&err))).await?;
                    continue;
                }
            };

            debug!(command = command.name(), "dispatching");
            match self.dispatch(command).await {
                Outcome::Reply(response) => write_line(&mut output, &response).await?,
                Outcome::Shutdown => {
                    debug!("quit received, stopping");
                    break;
                }
            }
        }

        // EOF without quit still releases the socket.
        self.teardown().await;
        info!("sidecar loop finished");
        Ok(())
    }

    /// Handle `connect`: (re)open the backend connection.
    async fn handle_connect(&mut self, addr: Option<String>) -> Response {
        if let Some(addr) = addr {
            if !addr.is_empty() {
                self.server_addr = addr;
            }
        }

        // Reconnecting replaces any existing connection.
        self.teardown().await;

        match BackendClient::connect(&self.server_addr, self.settings.timeout()).await {
            Ok(client) => {
                self.backend = Some(client);
                info!(addr = %self.server_addr, "connected to inference server");
                Response::Connected {
                    message: format!("connected to {}", self.server_addr),
                }
            }
            Err(err) => {
                warn!(addr = %self.server_addr, error = %err, "connect failed");
                Response::error(format!("failed to connect: {}", wire_message(&err)))
            }
        }
    }

    /// Handle `predict`: prepare the frame and run one backend exchange.
    async fn handle_predict(&mut self, image_b64: &str) -> Response {
        let Some(backend) = self.backend.as_mut() else {
            return Response::prediction_error("not connected");
        };

        let frame = match prepare_frame(image_b64) {
            Ok(frame) => frame,
            Err(err) => return Response::prediction_error(wire_message(&err)),
        };

        match backend.predict(&frame).await {
            Ok(prediction) => Response::Prediction(prediction.into()),
            Err(err) => {
                let message = wire_message(&err);
                if matches!(err, AppError::Timeout(_) | AppError::Io(_)) {
                    // The REQ socket is stuck mid-exchange; drop it so the
                    // host sees the session as disconnected.
                    warn!(error = %message, "exchange failed, dropping connection");
                    self.teardown().await;
                }
                Response::prediction_error(message)
            }
        }
    }

    /// Close the backend connection if one is open.
    async fn teardown(&mut self) {
        if let Some(client) = self.backend.take() {
            client.close().await;
            debug!("backend connection closed");
        }
    }
}

/// Strip the internal domain prefix for host-facing message strings.
fn wire_message(err: &AppError) -> String {
    match err {
        AppError::Config(msg)
        | AppError::Protocol(msg)
        | AppError::Backend(msg)
        | AppError::Frame(msg)
        | AppError::Timeout(msg)
        | AppError::Io(msg) => msg.clone(),
    }
}

/// Serialize `response` as one NDJSON line and flush it to `output`.
async fn write_line<W>(output: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut bytes = serialize_response(response)?;
    bytes.push(b'\n');

    output
        .write_all(&bytes)
        .await
        .map_err(|e| AppError::Io(format!("write failed: {e}")))?;
    output
        .flush()
        .await
        .map_err(|e| AppError::Io(format!("flush failed: {e}")))?;
    Ok(())
}

/// Serialize a response to compact single-line JSON.
fn serialize_response<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| AppError::Io(format!("failed to serialize response: {e}")))
}
