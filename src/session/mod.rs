//! Generation session layer.
//!
//! Everything above the wire protocol: the session controller and runtime,
//! the file workspace reconstructor, the content formatter, the mode-gated
//! reasoning channel, the answer-mode tracker, and the event surface the
//! hosting UI listens on.

mod answer;
mod controller;
mod event_handler;
mod format;
mod reasoning;
mod runtime;
mod types;
mod workspace;

pub use answer::{AnswerSession, AnswerTracker};
pub use controller::{GenerationRuntime, GenerationSession};
pub use format::normalize_content;
pub use reasoning::{render_entry, ReasoningEmitter, ReasoningEvent, ReasoningKind};
pub use runtime::{CommandLogEntry, EventSink, MemorySink, SessionEvent};
pub use types::{
    AnswerStatus, FileStatus, GenerationError, GenerationMode, SessionConfig, SessionStatus,
};
pub use workspace::{language_for_path, FileRecord, FileWorkspace, WorkspaceSnapshot};
