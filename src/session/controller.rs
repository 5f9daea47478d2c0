//! Generation session controller.
//!
//! One session per submitted prompt. The controller opens the streaming
//! request, spawns a single processing task that pumps the decoder and the
//! router, and owns the cooperative cancellation handles. All reconstruction
//! state is touched only from that task; the mode flag is the one value the
//! host may toggle from outside while streaming.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use futures::StreamExt;

use super::answer::AnswerTracker;
use super::event_handler::{FrameRouter, RouteOutcome};
use super::reasoning::{ReasoningEmitter, ReasoningEvent};
use super::runtime::{EventSink, SessionEvent};
use super::types::{GenerationError, GenerationMode, SessionConfig, SessionStatus};
use super::workspace::{FileWorkspace, WorkspaceSnapshot};
use crate::protocol::{parse_payload, FrameDecoder};
use crate::transport::{GenerationRequest, GenerationTransport};

/// One end-to-end generation request, prompt submission to terminal status.
pub struct GenerationSession {
    id: String,
    prompt: String,
    mode: Arc<RwLock<GenerationMode>>,
    status: Arc<RwLock<SessionStatus>>,
    /// Whether an abort has been requested.
    abort_flag: Arc<AtomicBool>,
    /// Wakes the processing task out of a pending read.
    abort_notify: Arc<Notify>,
    in_flight: Arc<AtomicBool>,
    workspace: Arc<Mutex<FileWorkspace>>,
    answers: Arc<Mutex<AnswerTracker>>,
    reasoning: ReasoningEmitter,
    sink: Arc<dyn EventSink>,
    transport: Arc<dyn GenerationTransport>,
    task: AsyncMutex<Option<JoinHandle<()>>>,
}

impl GenerationSession {
    pub fn new(
        prompt: impl Into<String>,
        mode: GenerationMode,
        transport: Arc<dyn GenerationTransport>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let mode = Arc::new(RwLock::new(mode));
        let answers = Arc::new(Mutex::new(AnswerTracker::new(sink.clone())));
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            mode: mode.clone(),
            status: Arc::new(RwLock::new(SessionStatus::Idle)),
            abort_flag: Arc::new(AtomicBool::new(false)),
            abort_notify: Arc::new(Notify::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            workspace: Arc::new(Mutex::new(FileWorkspace::new())),
            answers,
            reasoning: ReasoningEmitter::new(mode, sink.clone()),
            sink,
            transport,
            task: AsyncMutex::new(None),
        }
    }

    /// Returns the session ID.
    pub fn session_id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.read()
    }

    pub fn mode(&self) -> GenerationMode {
        *self.mode.read()
    }

    /// Toggle the mode while streaming. Takes effect at the next frame and
    /// the next reasoning emission; already-rendered entries are untouched.
    pub fn set_mode(&self, mode: GenerationMode) {
        *self.mode.write() = mode;
        self.sink.emit(SessionEvent::StateChanged {
            mode,
            status: self.status(),
        });
    }

    /// Whether the processing task is still pulling frames.
    pub fn is_streaming(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Current reconstruction state, for hosts that pull.
    pub fn workspace_snapshot(&self) -> WorkspaceSnapshot {
        self.workspace.lock().snapshot()
    }

    /// Feed one narration event through the mode gate.
    pub fn emit_reasoning(&self, event: &ReasoningEvent) -> bool {
        self.reasoning.emit(event)
    }

    /// Open the stream and spawn the processing task.
    ///
    /// Transport-level failures (connect error, non-2xx) surface here and
    /// leave the session in `Error` state.
    pub async fn start(&self) -> Result<(), GenerationError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(GenerationError::AlreadyStreaming);
        }

        let request = GenerationRequest {
            prompt: self.prompt.clone(),
        };
        let stream = match self.transport.open_stream(request).await {
            Ok(stream) => stream,
            Err(err) => {
                self.in_flight.store(false, Ordering::SeqCst);
                self.set_status(SessionStatus::Error);
                self.sink.emit(SessionEvent::Error {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        self.set_status(SessionStatus::Streaming);

        // Answer-mode sessions key their accumulation by the session id and
        // show the originating prompt in the command log.
        if self.mode().is_answer_mode() {
            self.answers.lock().start(&self.id, Some(&self.prompt), false);
        }

        let router = FrameRouter::new(
            self.id.clone(),
            self.mode.clone(),
            self.workspace.clone(),
            self.answers.clone(),
            self.sink.clone(),
        );

        let status = self.status.clone();
        let abort_flag = self.abort_flag.clone();
        let abort_notify = self.abort_notify.clone();
        let in_flight = self.in_flight.clone();
        let sink = self.sink.clone();
        let session_id = self.id.clone();

        let handle = tokio::spawn(async move {
            Self::pump_stream(
                stream,
                router,
                status,
                abort_flag,
                abort_notify,
                sink,
                &session_id,
            )
            .await;
            in_flight.store(false, Ordering::SeqCst);
        });
        *self.task.lock().await = Some(handle);

        Ok(())
    }

    /// Request cancellation and wait for the processing task to stop.
    ///
    /// Not an error path: accumulated file content is preserved exactly as
    /// last written, and no frame received after the signal is processed.
    pub async fn abort(&self) {
        self.abort_flag.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so the signal is not lost if the
        // processing task is between reads when it fires.
        self.abort_notify.notify_one();

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Read frames until a terminal frame, stream end, or abort.
    async fn pump_stream(
        mut stream: crate::transport::ByteStream,
        router: FrameRouter,
        status: Arc<RwLock<SessionStatus>>,
        abort_flag: Arc<AtomicBool>,
        abort_notify: Arc<Notify>,
        sink: Arc<dyn EventSink>,
        session_id: &str,
    ) {
        let mut decoder = FrameDecoder::new();

        let outcome = 'read: loop {
            // Cooperative cancellation point: no new read once aborted.
            if abort_flag.load(Ordering::SeqCst) {
                break 'read StreamOutcome::Cancelled;
            }

            let chunk = tokio::select! {
                _ = abort_notify.notified() => break 'read StreamOutcome::Cancelled,
                chunk = stream.next() => chunk,
            };

            match chunk {
                None => {
                    // Connection closed; a final unterminated line may still
                    // hold the terminal frame.
                    if let Some(payload) = decoder.flush() {
                        if let Some(outcome) = Self::process_payload(&router, &payload) {
                            break 'read outcome;
                        }
                    }
                    break 'read StreamOutcome::Truncated;
                }
                Some(Err(err)) => {
                    log::error!("session {session_id}: transport failed mid-stream: {err}");
                    break 'read StreamOutcome::Failed(err.to_string());
                }
                Some(Ok(bytes)) => {
                    // Every frame fully received before an abort is still
                    // processed; the abort takes effect at the next read.
                    for payload in decoder.feed(&bytes) {
                        if let Some(outcome) = Self::process_payload(&router, &payload) {
                            break 'read outcome;
                        }
                    }
                }
            }
        };

        match outcome {
            StreamOutcome::Completed => {
                Self::finish(&status, SessionStatus::Complete);
                log::debug!("session {session_id}: completed");
            }
            StreamOutcome::Failed(message) => {
                Self::finish(&status, SessionStatus::Error);
                sink.emit(SessionEvent::Error { message });
            }
            StreamOutcome::Truncated => {
                Self::finish(&status, SessionStatus::Error);
                sink.emit(SessionEvent::Error {
                    message: GenerationError::StreamTruncated.to_string(),
                });
            }
            StreamOutcome::Cancelled => {
                Self::finish(&status, SessionStatus::Cancelled);
                sink.emit(SessionEvent::Cancelled);
                log::debug!("session {session_id}: cancelled");
            }
        }
    }

    /// Interpret and route one payload. `Some` means the stream is done.
    fn process_payload(router: &FrameRouter, payload: &str) -> Option<StreamOutcome> {
        let frame = match parse_payload(payload) {
            Ok(frame) => frame,
            Err(err) => {
                // Malformed frames are skipped; the session keeps streaming.
                log::warn!("skipping malformed frame ({err}): {payload}");
                return None;
            }
        };
        match router.handle_frame(frame) {
            RouteOutcome::Continue => None,
            RouteOutcome::Complete => Some(StreamOutcome::Completed),
            RouteOutcome::Failed(message) => Some(StreamOutcome::Failed(message)),
        }
    }

    fn set_status(&self, next: SessionStatus) {
        Self::transition(&self.status, next);
        self.sink.emit(SessionEvent::StateChanged {
            mode: self.mode(),
            status: self.status(),
        });
    }

    fn finish(status: &Arc<RwLock<SessionStatus>>, next: SessionStatus) {
        Self::transition(status, next);
    }

    /// Terminal statuses are sticky; later transitions are ignored.
    fn transition(status: &Arc<RwLock<SessionStatus>>, next: SessionStatus) {
        let mut current = status.write();
        if current.is_terminal() {
            return;
        }
        *current = next;
    }
}

/// How the processing loop ended.
enum StreamOutcome {
    Completed,
    Failed(String),
    Truncated,
    Cancelled,
}

/// Bridging surface for the hosting UI.
///
/// Owns at most one active session; starting a new one supersedes the
/// previous session's in-memory state (aborting it first if still
/// streaming). These two entry points are all the host needs to drive the
/// subsystem.
pub struct GenerationRuntime {
    config: SessionConfig,
    transport: Arc<dyn GenerationTransport>,
    sink: Arc<dyn EventSink>,
    current: AsyncMutex<Option<Arc<GenerationSession>>>,
}

impl GenerationRuntime {
    /// Runtime talking to a real HTTP endpoint.
    pub fn new(config: SessionConfig, sink: Arc<dyn EventSink>) -> Self {
        let transport = Arc::new(crate::transport::HttpTransport::new(config.endpoint.clone()));
        Self::with_transport(config, transport, sink)
    }

    /// Runtime with an injected transport (tests, alternative protocols).
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn GenerationTransport>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            transport,
            sink,
            current: AsyncMutex::new(None),
        }
    }

    /// Start a generation session for `prompt`.
    ///
    /// `mode` falls back to the configured default. The previous session, if
    /// any, is superseded.
    pub async fn start_session(
        &self,
        prompt: &str,
        mode: Option<GenerationMode>,
    ) -> Result<Arc<GenerationSession>, GenerationError> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            if previous.is_streaming() {
                log::debug!(
                    "superseding streaming session {}",
                    previous.session_id()
                );
                previous.abort().await;
            }
        }

        let session = Arc::new(GenerationSession::new(
            prompt,
            mode.unwrap_or(self.config.mode),
            self.transport.clone(),
            self.sink.clone(),
        ));
        session.start().await?;
        *current = Some(session.clone());
        Ok(session)
    }

    /// Whether a session is currently streaming.
    pub async fn is_streaming(&self) -> bool {
        self.current
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| session.is_streaming())
    }

    /// Handle to the active (or most recent) session.
    pub async fn current_session(&self) -> Option<Arc<GenerationSession>> {
        self.current.lock().await.clone()
    }
}
