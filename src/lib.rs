//! Streaming client core for AI code generation sessions.
//!
//! A host submits a natural-language prompt and receives the generated code
//! file by file, in real time, over a single long-lived HTTP response. This
//! crate owns the session lifecycle, the frame protocol, and the
//! reconstruction state machines; rendering, model routing, and persistence
//! belong to the hosting application.
//!
//! Typical wiring:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use codestream::{GenerationMode, GenerationRuntime, MemorySink, SessionConfig};
//!
//! let sink = Arc::new(MemorySink::new());
//! let runtime = GenerationRuntime::new(
//!     SessionConfig::new("https://gen.example.com/v1/stream", GenerationMode::Quick),
//!     sink.clone(),
//! );
//! let session = runtime.start_session("build a todo app", None).await?;
//! // ... sink receives FileOpened / FileAppended / Complete events ...
//! ```

pub mod protocol;
pub mod session;
pub mod transport;

pub use protocol::{parse_payload, Frame, FrameDecoder, FrameParseError};
pub use session::{
    AnswerSession, AnswerStatus, AnswerTracker, CommandLogEntry, EventSink, FileRecord,
    FileStatus, FileWorkspace, GenerationError, GenerationMode, GenerationRuntime,
    GenerationSession, MemorySink, ReasoningEmitter, ReasoningEvent, ReasoningKind,
    SessionConfig, SessionEvent, SessionStatus, WorkspaceSnapshot,
};
pub use transport::{ByteStream, GenerationRequest, GenerationTransport, HttpTransport};
