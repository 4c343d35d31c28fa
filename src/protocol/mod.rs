//! Stdio wire protocol: NDJSON framing plus command and response types.

pub mod codec;
pub mod command;
pub mod response;

pub use codec::{InboundLine, WireCodec};
pub use command::{parse_command, Command};
pub use response::{PredictionResult, Response};
