//! Frame preparation for `predict` requests.
//!
//! The host sends screenshots as base64-encoded PNG or JPEG. The server
//! expects a fixed-size raw RGB frame, so the payload is decoded, converted
//! to RGB8, and resized before transmission.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use serde::Serialize;

use crate::{AppError, Result};

/// Edge length of the frame shipped to the inference server, in pixels.
pub const FRAME_EDGE: u32 = 256;

/// A prepared frame: raw RGB8 pixels at [`FRAME_EDGE`] × [`FRAME_EDGE`].
///
/// Serializes as the `image` field of a backend `predict` request, with the
/// pixel buffer base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Base64-encoded raw RGB8 pixel buffer, row-major.
    pub pixels: String,
}

/// Decode a base64 image payload into a server-ready [`Frame`].
///
/// The payload is base64-decoded, parsed as PNG or JPEG, converted to RGB8,
/// and resized to [`FRAME_EDGE`] × [`FRAME_EDGE`].
///
/// # Errors
///
/// Returns [`AppError::Frame`] if the payload is not valid base64 or not a
/// decodable image.
pub fn prepare_frame(image_b64: &str) -> Result<Frame> {
    let raw = STANDARD
        .decode(image_b64.trim())
        .map_err(|e| AppError::Frame(format!("invalid base64 image payload: {e}")))?;

    let decoded = image::load_from_memory(&raw)
        .map_err(|e| AppError::Frame(format!("undecodable image payload: {e}")))?;

    let resized = decoded.resize_exact(FRAME_EDGE, FRAME_EDGE, FilterType::Triangle);
    let pixels = resized.to_rgb8().into_raw();

    Ok(Frame {
        width: FRAME_EDGE,
        height: FRAME_EDGE,
        pixels: STANDARD.encode(pixels),
    })
}
