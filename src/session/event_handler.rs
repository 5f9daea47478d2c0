//! Frame routing for the generation session.
//!
//! One router per session, driven exclusively from the session's processing
//! task. File frames mutate the workspace; in answer mode the same wire
//! frames drive the answer tracker instead. The mode is read fresh for each
//! frame.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::answer::AnswerTracker;
use super::format::normalize_content;
use super::runtime::{EventSink, SessionEvent};
use super::types::GenerationMode;
use super::workspace::{FileRecord, FileWorkspace};
use crate::protocol::Frame;

/// What the processing loop should do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RouteOutcome {
    Continue,
    /// `COMPLETE` seen; stop pulling frames.
    Complete,
    /// `ERROR` frame seen; stop with this message.
    Failed(String),
}

pub(super) struct FrameRouter {
    session_id: String,
    mode: Arc<RwLock<GenerationMode>>,
    workspace: Arc<Mutex<FileWorkspace>>,
    answers: Arc<Mutex<AnswerTracker>>,
    sink: Arc<dyn EventSink>,
}

impl FrameRouter {
    pub(super) fn new(
        session_id: String,
        mode: Arc<RwLock<GenerationMode>>,
        workspace: Arc<Mutex<FileWorkspace>>,
        answers: Arc<Mutex<AnswerTracker>>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            session_id,
            mode,
            workspace,
            answers,
            sink,
        }
    }

    pub(super) fn handle_frame(&self, frame: Frame) -> RouteOutcome {
        let mode = *self.mode.read();
        if mode.is_answer_mode() {
            self.handle_answer_frame(frame)
        } else {
            self.handle_file_frame(frame)
        }
    }

    fn handle_file_frame(&self, frame: Frame) -> RouteOutcome {
        match frame {
            Frame::FileOpen { path } => {
                let language = {
                    let mut workspace = self.workspace.lock();
                    workspace.open(&path);
                    workspace
                        .get(&path)
                        .map(|r| r.language.clone())
                        .unwrap_or_default()
                };
                self.sink.emit(SessionEvent::FileOpened {
                    path: path.clone(),
                    language,
                });
                self.sink.emit(SessionEvent::ActiveFileChanged { path: Some(path) });
                RouteOutcome::Continue
            }
            Frame::Append { text } => {
                let routed = self.workspace.lock().append(&text);
                if let Some(path) = routed {
                    self.sink.emit(SessionEvent::FileAppended { path, text });
                }
                // Orphan appends were counted and logged by the workspace.
                RouteOutcome::Continue
            }
            Frame::FileClose { path } => {
                let (known, content, active) = {
                    let mut workspace = self.workspace.lock();
                    let active_before = workspace.active_path().map(str::to_string);
                    let known = workspace.close(&path);
                    let content = workspace
                        .get(&path)
                        .map(|r| normalize_content(&r.content))
                        .unwrap_or_default();
                    let active_after = workspace.active_path().map(str::to_string);
                    let changed = active_before != active_after;
                    (known, content, changed.then_some(active_after))
                };
                if known {
                    self.sink.emit(SessionEvent::FileClosed { path, content });
                }
                if let Some(active) = active {
                    self.sink.emit(SessionEvent::ActiveFileChanged { path: active });
                }
                RouteOutcome::Continue
            }
            Frame::Complete => {
                let files = self.final_files();
                self.sink.emit(SessionEvent::Complete { files });
                RouteOutcome::Complete
            }
            Frame::Error { message } => RouteOutcome::Failed(message),
        }
    }

    fn handle_answer_frame(&self, frame: Frame) -> RouteOutcome {
        match frame {
            Frame::Append { text } => {
                self.answers.lock().chunk(&self.session_id, &text);
                RouteOutcome::Continue
            }
            Frame::Complete => {
                self.answers.lock().complete(&self.session_id);
                RouteOutcome::Complete
            }
            Frame::Error { message } => {
                self.answers.lock().fail(&self.session_id, &message);
                RouteOutcome::Failed(message)
            }
            other @ (Frame::FileOpen { .. } | Frame::FileClose { .. }) => {
                log::debug!("ignoring {} frame in answer mode", other.kind());
                RouteOutcome::Continue
            }
        }
    }

    /// Final file set with formatter-normalized content.
    fn final_files(&self) -> Vec<FileRecord> {
        self.workspace
            .lock()
            .files()
            .into_iter()
            .map(|mut record| {
                record.content = normalize_content(&record.content);
                record
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::runtime::MemorySink;
    use crate::session::types::FileStatus;

    fn router(mode: GenerationMode) -> (FrameRouter, Arc<MemorySink>, Arc<Mutex<FileWorkspace>>) {
        let sink = Arc::new(MemorySink::new());
        let workspace = Arc::new(Mutex::new(FileWorkspace::new()));
        let answers = Arc::new(Mutex::new(AnswerTracker::new(sink.clone())));
        let router = FrameRouter::new(
            "session-1".to_string(),
            Arc::new(RwLock::new(mode)),
            workspace.clone(),
            answers,
            sink.clone(),
        );
        (router, sink, workspace)
    }

    fn open(path: &str) -> Frame {
        Frame::FileOpen {
            path: path.to_string(),
        }
    }

    fn append(text: &str) -> Frame {
        Frame::Append {
            text: text.to_string(),
        }
    }

    fn close(path: &str) -> Frame {
        Frame::FileClose {
            path: path.to_string(),
        }
    }

    #[test]
    fn reference_scenario_builds_one_done_file() {
        let (router, _sink, workspace) = router(GenerationMode::Quick);
        assert_eq!(router.handle_frame(open("app.ts")), RouteOutcome::Continue);
        assert_eq!(router.handle_frame(append("const x=1;\n")), RouteOutcome::Continue);
        assert_eq!(router.handle_frame(append("const y=2;\n")), RouteOutcome::Continue);
        assert_eq!(router.handle_frame(close("app.ts")), RouteOutcome::Continue);
        assert_eq!(router.handle_frame(Frame::Complete), RouteOutcome::Complete);

        let workspace = workspace.lock();
        let record = workspace.get("app.ts").unwrap();
        assert_eq!(record.content, "const x=1;\nconst y=2;\n");
        assert_eq!(record.status, FileStatus::Done);
    }

    #[test]
    fn complete_reports_formatted_files() {
        let (router, sink, _workspace) = router(GenerationMode::Quick);
        router.handle_frame(open("a.rs"));
        router.handle_frame(append("fn main() {}   "));
        router.handle_frame(close("a.rs"));
        router.handle_frame(Frame::Complete);

        let completed = sink.events().into_iter().find_map(|e| match e {
            SessionEvent::Complete { files } => Some(files),
            _ => None,
        });
        let files = completed.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content, "fn main() {}\n");
    }

    #[test]
    fn error_frame_fails_the_session() {
        let (router, _sink, _workspace) = router(GenerationMode::Quick);
        assert_eq!(
            router.handle_frame(Frame::Error {
                message: "overloaded".to_string()
            }),
            RouteOutcome::Failed("overloaded".to_string())
        );
    }

    #[test]
    fn close_of_current_file_announces_new_active() {
        let (router, sink, _workspace) = router(GenerationMode::Quick);
        router.handle_frame(open("a.ts"));
        router.handle_frame(open("b.ts"));
        router.handle_frame(close("b.ts"));

        let last_active = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::ActiveFileChanged { path } => Some(path),
                _ => None,
            })
            .last();
        assert_eq!(last_active, Some(Some("a.ts".to_string())));
    }

    #[test]
    fn close_of_unknown_path_emits_nothing() {
        let (router, sink, _workspace) = router(GenerationMode::Quick);
        router.handle_frame(close("ghost.ts"));
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::FileClosed { .. })));
    }

    #[test]
    fn ask_mode_routes_appends_to_the_answer() {
        let (router, sink, workspace) = router(GenerationMode::Ask);
        router.handle_frame(append("The answer "));
        router.handle_frame(append("is 42."));
        assert_eq!(router.handle_frame(Frame::Complete), RouteOutcome::Complete);

        assert!(workspace.lock().files().is_empty());
        assert!(sink.events().iter().any(|e| {
            matches!(e, SessionEvent::AnswerCompleted { text, .. } if text == "The answer is 42.")
        }));
    }

    #[test]
    fn ask_mode_ignores_file_frames() {
        let (router, _sink, workspace) = router(GenerationMode::Ask);
        assert_eq!(router.handle_frame(open("a.ts")), RouteOutcome::Continue);
        assert_eq!(router.handle_frame(close("a.ts")), RouteOutcome::Continue);
        assert!(workspace.lock().files().is_empty());
    }
}
