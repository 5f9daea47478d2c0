//! Mode-gated reasoning narration.
//!
//! The generator narrates its progress through a second event taxonomy that
//! is independent of file reconstruction. Narration is display-only: when
//! the session mode does not permit it, events are dropped on the spot and
//! nothing is buffered for replay if the mode is re-enabled later.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::runtime::{CommandLogEntry, EventSink, SessionEvent};
use super::types::GenerationMode;

/// What a reasoning event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningKind {
    Planning,
    Researching,
    Executing,
    Drafting,
    User,
    Summary,
}

impl std::fmt::Display for ReasoningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReasoningKind::Planning => "planning",
            ReasoningKind::Researching => "researching",
            ReasoningKind::Executing => "executing",
            ReasoningKind::Drafting => "drafting",
            ReasoningKind::User => "user",
            ReasoningKind::Summary => "summary",
        };
        write!(f, "{label}")
    }
}

/// One narration event from the generator.
///
/// Any subset of `items`, `text` and `output` may be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningEvent {
    pub kind: ReasoningKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

impl ReasoningEvent {
    pub fn new(kind: ReasoningKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp,
            items: Vec::new(),
            text: None,
            output: None,
        }
    }
}

/// Render one event into a command-log entry.
///
/// Header first (kind + timestamp), then each item as a bullet line
/// (existing list markers are preserved), then `text`, then `output`
/// line-by-line.
pub fn render_entry(event: &ReasoningEvent) -> CommandLogEntry {
    let mut lines = Vec::new();
    lines.push(format!(
        "[{}] {}",
        event.kind,
        event.timestamp.format("%H:%M:%S")
    ));

    for item in &event.items {
        let trimmed = item.trim_start();
        if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("• ") {
            lines.push(item.clone());
        } else {
            lines.push(format!("• {item}"));
        }
    }

    if let Some(text) = &event.text {
        lines.push(text.clone());
    }

    if let Some(output) = &event.output {
        for line in output.lines() {
            lines.push(line.to_string());
        }
    }

    CommandLogEntry {
        kind: event.kind,
        timestamp: event.timestamp,
        lines,
    }
}

/// Emits reasoning entries into the command log, gated on the live mode.
///
/// The mode flag is shared with the session and may be toggled from outside
/// the processing task at any time; it is read fresh at each emission.
pub struct ReasoningEmitter {
    mode: Arc<RwLock<GenerationMode>>,
    sink: Arc<dyn EventSink>,
}

impl ReasoningEmitter {
    pub fn new(mode: Arc<RwLock<GenerationMode>>, sink: Arc<dyn EventSink>) -> Self {
        Self { mode, sink }
    }

    /// Render `event` into the command log, or drop it entirely when the
    /// current mode forbids narration display. Returns whether it rendered.
    pub fn emit(&self, event: &ReasoningEvent) -> bool {
        let mode = *self.mode.read();
        if !mode.shows_reasoning() {
            log::debug!("dropping {} reasoning event in {mode} mode", event.kind);
            return false;
        }
        self.sink.emit(SessionEvent::CommandLog {
            entry: render_entry(event),
        });
        true
    }
}
