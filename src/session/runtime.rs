//! Shared runtime primitives for the session layer.
//!
//! The hosting UI registers an [`EventSink`] on the controller and receives
//! every observable transition as a [`SessionEvent`]. The sink is injected
//! explicitly: the editor pane and the command log are listeners wired at
//! construction time, never discovered ambiently at call time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reasoning::ReasoningKind;
use super::types::{GenerationMode, SessionStatus};
use super::workspace::FileRecord;

/// One rendered command-log entry.
///
/// `lines` is the fully rendered body: header first, then bullets, text and
/// output lines in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandLogEntry {
    pub kind: ReasoningKind,
    pub timestamp: DateTime<Utc>,
    pub lines: Vec<String>,
}

/// Observable session updates pushed to registered listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A file was opened (or re-opened) and is now the append target.
    FileOpened {
        path: String,
        language: String,
    },
    /// Text was appended to a file still being written.
    FileAppended {
        path: String,
        text: String,
    },
    /// A file finished; `content` is formatter-normalized.
    FileClosed {
        path: String,
        content: String,
    },
    /// The file shown as "active" in the editor changed.
    ActiveFileChanged {
        path: Option<String>,
    },
    /// A reasoning or answer entry was rendered into the command log.
    CommandLog {
        entry: CommandLogEntry,
    },
    /// An answer-mode session started streaming.
    AnswerStarted {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// A chunk of answer text arrived.
    AnswerDelta {
        #[serde(rename = "sessionId")]
        session_id: String,
        text: String,
    },
    /// An answer-mode session finished; `text` is the full accumulation.
    AnswerCompleted {
        #[serde(rename = "sessionId")]
        session_id: String,
        text: String,
    },
    /// An answer-mode session failed; the message is appended to `text`.
    AnswerFailed {
        #[serde(rename = "sessionId")]
        session_id: String,
        text: String,
        message: String,
    },
    /// Mode or lifecycle status changed.
    StateChanged {
        mode: GenerationMode,
        status: SessionStatus,
    },
    /// The generation completed; the final formatted file set.
    Complete {
        files: Vec<FileRecord>,
    },
    /// The generation failed (transport failure or server `ERROR` frame).
    Error {
        message: String,
    },
    /// The user cancelled; accumulated content is preserved as-is.
    Cancelled,
}

/// Listener interface for session updates.
///
/// Implementations must be cheap and non-blocking; they are invoked from the
/// session's processing task.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Sink that buffers every event in memory.
///
/// Used by the test suites and handy for hosts that poll instead of push.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: parking_lot::Mutex<Vec<SessionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}
