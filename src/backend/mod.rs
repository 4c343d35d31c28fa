//! Backend connection to the `NitroGen` inference server.
//!
//! One `ZeroMQ` REQ socket, one JSON object per message, one in-flight
//! exchange at a time.

pub mod client;
pub mod frame;

pub use client::{BackendClient, Prediction, BUTTON_COUNT};
pub use frame::{prepare_frame, Frame, FRAME_EDGE};
