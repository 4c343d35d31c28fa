#![forbid(unsafe_code)]

//! `nitrogen-sidecar` — stdio bridge between a host application and a
//! `NitroGen` inference server.
//!
//! The host drives the sidecar with newline-delimited JSON commands on
//! stdin; the sidecar forwards prediction requests to the server over a
//! `ZeroMQ` request/reply socket and answers with newline-delimited JSON
//! on stdout.

pub mod backend;
pub mod config;
pub mod errors;
pub mod protocol;
pub mod session;

pub use config::Settings;
pub use errors::{AppError, Result};
