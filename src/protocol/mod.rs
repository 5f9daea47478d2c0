//! Wire protocol for the generation event stream.
//!
//! `decoder` turns arbitrary byte chunks into raw payload lines; `frame`
//! turns payload lines into typed [`Frame`] values, supporting both the
//! structured JSON encoding and the legacy verb-prefixed encoding.

mod decoder;
mod frame;

pub use decoder::FrameDecoder;
pub use frame::{parse_payload, Frame, FrameParseError};
