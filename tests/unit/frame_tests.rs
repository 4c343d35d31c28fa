//! Unit tests for frame preparation.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use nitrogen_sidecar::backend::{prepare_frame, FRAME_EDGE};
use nitrogen_sidecar::AppError;

/// Encode a solid-color PNG of the given size as a base64 payload.
fn png_base64(width: u32, height: u32, color: [u8; 3]) -> String {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .expect("PNG encoding must succeed");
    STANDARD.encode(buf.into_inner())
}

/// Any input size is resized to the fixed server frame size, RGB8.
#[test]
fn frames_are_resized_to_the_server_edge() {
    let payload = png_base64(64, 48, [10, 200, 30]);

    let frame = prepare_frame(&payload).expect("valid PNG must prepare");

    assert_eq!(frame.width, FRAME_EDGE);
    assert_eq!(frame.height, FRAME_EDGE);

    let pixels = STANDARD
        .decode(&frame.pixels)
        .expect("pixel buffer must be valid base64");
    let expected_len = FRAME_EDGE as usize * FRAME_EDGE as usize * 3;
    assert_eq!(
        pixels.len(),
        expected_len,
        "pixel buffer must be raw RGB8 at the frame size"
    );
}

/// Resizing a solid-color image keeps the color.
#[test]
fn solid_color_survives_the_resize() {
    let payload = png_base64(32, 32, [10, 200, 30]);

    let frame = prepare_frame(&payload).expect("valid PNG must prepare");
    let pixels = STANDARD
        .decode(&frame.pixels)
        .expect("pixel buffer must be valid base64");

    assert_eq!(&pixels[..3], &[10, 200, 30]);
}

/// The frame serializes with the field names the backend wire expects.
#[test]
fn frame_serializes_with_wire_field_names() {
    let payload = png_base64(8, 8, [0, 0, 0]);
    let frame = prepare_frame(&payload).expect("valid PNG must prepare");

    let value = serde_json::to_value(&frame).expect("frame must serialize");
    assert_eq!(value["width"], FRAME_EDGE);
    assert_eq!(value["height"], FRAME_EDGE);
    assert!(
        value["pixels"].is_string(),
        "pixels must serialize as a base64 string"
    );
}

/// Garbage base64 surfaces as a frame error, not a panic or an I/O error.
#[test]
fn invalid_base64_is_a_frame_error() {
    match prepare_frame("!!! definitely not base64 !!!") {
        Err(AppError::Frame(msg)) => assert!(
            msg.contains("invalid base64"),
            "error must mention base64, got: {msg}"
        ),
        other => panic!("expected Err(AppError::Frame), got: {other:?}"),
    }
}

/// Valid base64 that is not an image surfaces as a frame error.
#[test]
fn undecodable_image_is_a_frame_error() {
    let payload = STANDARD.encode(b"this is not a png");

    match prepare_frame(&payload) {
        Err(AppError::Frame(msg)) => assert!(
            msg.contains("undecodable image"),
            "error must mention the image decode, got: {msg}"
        ),
        other => panic!("expected Err(AppError::Frame), got: {other:?}"),
    }
}

/// The empty payload (a `predict` without an `image` field) fails cleanly.
#[test]
fn empty_payload_is_a_frame_error() {
    assert!(
        matches!(prepare_frame(""), Err(AppError::Frame(_))),
        "empty payload must fail as a frame error"
    );
}
