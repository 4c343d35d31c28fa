//! NDJSON codec for the host-facing stdio stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a configurable maximum line
//! length to prevent memory exhaustion caused by unterminated or runaway
//! lines from a misbehaving host. The limit is generous because a `predict`
//! command carries a whole base64-encoded screenshot on one line.
//!
//! Use [`WireCodec`] as the codec parameter for
//! [`tokio_util::codec::FramedRead`] over stdin. Each newline-terminated
//! UTF-8 string is one complete command.
//!
//! # Oversized lines
//!
//! An oversized line must not end the stream: [`FramedRead`] permanently
//! fuses once its decoder returns `Err`, so surfacing the length violation
//! as an error would terminate the command loop. The codec instead yields
//! [`InboundLine::Oversized`] as a regular item, exactly once per long
//! line; the wrapped [`LinesCodec`] keeps discarding the remainder of that
//! line internally until the next newline. Only genuine I/O failures are
//! returned as errors.
//!
//! [`FramedRead`]: tokio_util::codec::FramedRead

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Default maximum line length accepted by the codec: 16 MiB.
pub const MAX_LINE_BYTES: usize = 16 * 1_048_576;

/// One decoded item from the inbound command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundLine {
    /// A complete newline-terminated line, without the trailing `\n`.
    Complete(String),
    /// A line that exceeded the configured length limit. The rest of the
    /// line is discarded by the codec; decoding resumes at the next line.
    Oversized,
}

/// NDJSON decoder for the inbound command stream.
///
/// Delegates line-framing to [`LinesCodec`]. Inbound lines longer than the
/// configured limit are reported as [`InboundLine::Oversized`] items rather
/// than stream errors, so the surrounding loop keeps running.
#[derive(Debug)]
pub struct WireCodec(LinesCodec);

impl WireCodec {
    /// Create a new `WireCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a new `WireCodec` with an explicit line-length limit.
    #[must_use]
    pub fn with_max_length(max_line_bytes: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_line_bytes))
    }
}

impl Default for WireCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WireCodec {
    type Item = InboundLine;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` contains no complete line yet.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] only for failures of the underlying stream.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decode(self.0.decode(src))
    }

    /// Decode the final line when the stream reaches EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decode(self.0.decode_eof(src))
    }
}

/// Map a [`LinesCodec`] decode result onto [`InboundLine`] items.
///
/// A length violation becomes `Ok(Some(InboundLine::Oversized))`; the inner
/// codec has already switched to discard mode for the rest of that line and
/// will not report it again.
fn map_decode(
    result: std::result::Result<Option<String>, LinesCodecError>,
) -> Result<Option<InboundLine>> {
    match result {
        Ok(line) => Ok(line.map(InboundLine::Complete)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(InboundLine::Oversized)),
        Err(LinesCodecError::Io(io_err)) => Err(AppError::Io(io_err.to_string())),
    }
}
