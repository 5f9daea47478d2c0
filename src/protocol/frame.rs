//! Generation stream frame types.
//!
//! This module defines the typed `Frame` union for the generation event
//! stream and the interpreter for its two payload encodings. The server
//! emits frames as `data: `-marked lines; the payload on each line is either
//! a JSON object with a `type` discriminator (current servers) or a
//! verb-prefixed plain-text line (legacy servers).
//!
//! ## Protocol Overview
//!
//! - `FILE_OPEN <path>` opens a file and makes it the append target
//! - `APPEND <text>` grows the current file
//! - `FILE_CLOSE <path>` finishes a file
//! - `COMPLETE` / `ERROR <message>` end the session
//!
//! Both encodings decode into the same `Frame` type so everything
//! downstream of the interpreter is format-agnostic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Frame Union
// ============================================================================

/// One decoded protocol frame from the generation stream.
///
/// The serde representation matches the structured wire encoding:
/// `{"type": "FILE_OPEN", "path": "src/app.ts"}` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frame {
    /// Open `path` (idempotent) and make it the current append target.
    FileOpen { path: String },

    /// Append `text` verbatim to the session's current file.
    Append { text: String },

    /// Mark `path` as finished. Idempotent.
    FileClose { path: String },

    /// The generation finished successfully.
    Complete,

    /// The generation failed server-side; fatal to the session.
    Error { message: String },
}

impl Frame {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::FileOpen { .. } => "FILE_OPEN",
            Frame::Append { .. } => "APPEND",
            Frame::FileClose { .. } => "FILE_CLOSE",
            Frame::Complete => "COMPLETE",
            Frame::Error { .. } => "ERROR",
        }
    }

    /// Whether this frame terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Complete | Frame::Error { .. })
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// Why a payload was rejected by the interpreter.
///
/// These are always non-fatal: the caller logs the rejection and keeps
/// consuming the stream.
#[derive(Error, Debug)]
pub enum FrameParseError {
    #[error("empty payload")]
    Empty,
    #[error("malformed structured frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown verb: {0}")]
    UnknownVerb(String),
    #[error("missing argument for verb: {0}")]
    MissingArgument(&'static str),
}

/// Interpret one raw payload string as a `Frame`.
///
/// A payload opening with `{` is treated as the structured JSON encoding;
/// anything else goes through the legacy verb-prefixed parser. Errors are
/// skippable: a bad frame must never take the session down.
pub fn parse_payload(payload: &str) -> Result<Frame, FrameParseError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(FrameParseError::Empty);
    }
    if trimmed.starts_with('{') {
        Ok(serde_json::from_str(trimmed)?)
    } else {
        // Legacy lines keep the argument verbatim, so only strip the left side.
        parse_legacy(payload.trim_start())
    }
}

/// Parse the legacy verb-prefixed encoding.
///
/// `APPEND` takes the remainder of the line verbatim (it is not split
/// further; generated code routinely contains spaces).
fn parse_legacy(payload: &str) -> Result<Frame, FrameParseError> {
    if let Some(rest) = payload.strip_prefix("FILE_OPEN ") {
        let path = rest.trim();
        if path.is_empty() {
            return Err(FrameParseError::MissingArgument("FILE_OPEN"));
        }
        return Ok(Frame::FileOpen {
            path: path.to_string(),
        });
    }
    if let Some(rest) = payload.strip_prefix("APPEND ") {
        return Ok(Frame::Append {
            text: rest.to_string(),
        });
    }
    if let Some(rest) = payload.strip_prefix("FILE_CLOSE ") {
        let path = rest.trim();
        if path.is_empty() {
            return Err(FrameParseError::MissingArgument("FILE_CLOSE"));
        }
        return Ok(Frame::FileClose {
            path: path.to_string(),
        });
    }
    if let Some(rest) = payload.strip_prefix("ERROR ") {
        return Ok(Frame::Error {
            message: rest.trim_end().to_string(),
        });
    }
    match payload.trim_end() {
        "COMPLETE" => Ok(Frame::Complete),
        "ERROR" => Ok(Frame::Error {
            message: String::new(),
        }),
        other => {
            let verb = other.split_whitespace().next().unwrap_or(other);
            Err(FrameParseError::UnknownVerb(verb.to_string()))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
