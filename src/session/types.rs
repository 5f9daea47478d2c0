//! Core types for the generation session layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a generation session behaves.
///
/// `Quick` and `Think` stream files into the workspace; `Think` additionally
/// displays the reasoning narration. `Ask` streams a plain-text answer
/// instead of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Quick,
    Think,
    Ask,
}

impl GenerationMode {
    /// Whether reasoning narration may be rendered under this mode.
    pub fn shows_reasoning(&self) -> bool {
        matches!(self, GenerationMode::Think)
    }

    /// Whether streamed text accumulates into an answer instead of files.
    pub fn is_answer_mode(&self) -> bool {
        matches!(self, GenerationMode::Ask)
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::Quick => write!(f, "quick"),
            GenerationMode::Think => write!(f, "think"),
            GenerationMode::Ask => write!(f, "ask"),
        }
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(GenerationMode::Quick),
            "think" => Ok(GenerationMode::Think),
            "ask" => Ok(GenerationMode::Ask),
            _ => Err(GenerationError::UnknownMode(s.to_string())),
        }
    }
}

/// Lifecycle status of a generation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Streaming,
    Complete,
    Error,
    Cancelled,
}

impl SessionStatus {
    /// Terminal statuses stop all further frame processing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Complete | SessionStatus::Error | SessionStatus::Cancelled
        )
    }
}

/// Status of a file being reconstructed from the stream.
///
/// Transitions are monotonic: `Writing → Done`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Writing,
    Done,
}

/// Status of an answer-mode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerStatus {
    Streaming,
    Complete,
    Error,
}

/// Configuration for creating a generation session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Generation endpoint URL the prompt is posted to.
    pub endpoint: String,
    /// Initial mode; can be toggled while streaming.
    pub mode: GenerationMode,
}

impl SessionConfig {
    pub fn new(endpoint: impl Into<String>, mode: GenerationMode) -> Self {
        Self {
            endpoint: endpoint.into(),
            mode,
        }
    }
}

/// Error type for session and transport operations.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation endpoint returned HTTP {status}")]
    HttpStatus { status: u16 },
    #[error("stream closed before completion")]
    StreamTruncated,
    #[error("a generation is already streaming")]
    AlreadyStreaming,
    #[error("unknown mode: {0}")]
    UnknownMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mode_round_trips_through_strings() {
        for mode in [GenerationMode::Quick, GenerationMode::Think, GenerationMode::Ask] {
            assert_eq!(GenerationMode::from_str(&mode.to_string()).unwrap(), mode);
        }
        assert!(GenerationMode::from_str("turbo").is_err());
    }

    #[test]
    fn only_think_shows_reasoning() {
        assert!(GenerationMode::Think.shows_reasoning());
        assert!(!GenerationMode::Quick.shows_reasoning());
        assert!(!GenerationMode::Ask.shows_reasoning());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Idle.is_terminal());
        assert!(!SessionStatus::Streaming.is_terminal());
        assert!(SessionStatus::Complete.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }
}
