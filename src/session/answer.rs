//! Answer-mode session tracking.
//!
//! Text-only sessions stream chunks into one growing answer keyed by a
//! session id, independent of file reconstruction. The tracker only keeps
//! state while a session is streaming; once it completes or fails the entry
//! is dropped and only the rendered output persists in the host's log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::reasoning::ReasoningKind;
use super::runtime::{CommandLogEntry, EventSink, SessionEvent};
use super::types::AnswerStatus;

/// One in-flight answer accumulation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSession {
    pub session_id: String,
    /// Ordered concatenation of every chunk received so far.
    pub text: String,
    pub status: AnswerStatus,
}

/// Registry of in-flight answer sessions.
pub struct AnswerTracker {
    sink: Arc<dyn EventSink>,
    active: HashMap<String, AnswerSession>,
}

impl AnswerTracker {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            active: HashMap::new(),
        }
    }

    /// Begin tracking `session_id`.
    ///
    /// Starting an id that is already in flight is the same logical session
    /// and a no-op. Unless the request originated from the command log
    /// itself, the prompt is recorded there as a display entry.
    pub fn start(&mut self, session_id: &str, prompt: Option<&str>, from_command_log: bool) {
        if self.active.contains_key(session_id) {
            log::debug!("answer session {session_id} already streaming; start ignored");
            return;
        }
        self.insert_streaming(session_id);

        if !from_command_log {
            if let Some(prompt) = prompt {
                self.sink.emit(SessionEvent::CommandLog {
                    entry: CommandLogEntry {
                        kind: ReasoningKind::User,
                        timestamp: Utc::now(),
                        lines: vec![prompt.to_string()],
                    },
                });
            }
        }
    }

    /// Append a chunk in arrival order.
    ///
    /// A chunk for an unseen id creates the session on the spot, so a lost
    /// or reordered start event cannot wedge the stream.
    pub fn chunk(&mut self, session_id: &str, text: &str) {
        if !self.active.contains_key(session_id) {
            log::debug!("answer chunk for unseen session {session_id}; creating lazily");
            self.insert_streaming(session_id);
        }
        if let Some(session) = self.active.get_mut(session_id) {
            session.text.push_str(text);
        }

        self.sink.emit(SessionEvent::AnswerDelta {
            session_id: session_id.to_string(),
            text: text.to_string(),
        });
    }

    /// Finish `session_id` successfully and drop its tracking state.
    pub fn complete(&mut self, session_id: &str) {
        let Some(mut session) = self.active.remove(session_id) else {
            log::debug!("complete for unknown answer session {session_id}");
            return;
        };
        session.status = AnswerStatus::Complete;
        self.sink.emit(SessionEvent::AnswerCompleted {
            session_id: session.session_id,
            text: session.text,
        });
    }

    /// Fail `session_id`: the message joins the displayed text, then the
    /// tracking state is dropped.
    pub fn fail(&mut self, session_id: &str, message: &str) {
        let Some(mut session) = self.active.remove(session_id) else {
            log::debug!("error for unknown answer session {session_id}");
            return;
        };
        session.status = AnswerStatus::Error;
        if !session.text.is_empty() && !session.text.ends_with('\n') {
            session.text.push('\n');
        }
        session.text.push_str(message);

        self.sink.emit(SessionEvent::AnswerFailed {
            session_id: session.session_id,
            text: session.text,
            message: message.to_string(),
        });
    }

    /// Whether `session_id` is still accumulating.
    pub fn is_active(&self, session_id: &str) -> bool {
        self.active.contains_key(session_id)
    }

    /// Current text of an in-flight session.
    pub fn text(&self, session_id: &str) -> Option<&str> {
        self.active.get(session_id).map(|s| s.text.as_str())
    }

    fn insert_streaming(&mut self, session_id: &str) {
        self.active.insert(
            session_id.to_string(),
            AnswerSession {
                session_id: session_id.to_string(),
                text: String::new(),
                status: AnswerStatus::Streaming,
            },
        );
        self.sink.emit(SessionEvent::AnswerStarted {
            session_id: session_id.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::runtime::MemorySink;

    fn new_tracker() -> (AnswerTracker, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        (AnswerTracker::new(sink.clone()), sink)
    }

    #[test]
    fn accumulates_chunks_in_order() {
        let (mut tracker, _sink) = new_tracker();
        tracker.start("s1", Some("write a sort"), false);
        tracker.chunk("s1", "Here ");
        tracker.chunk("s1", "is ");
        tracker.chunk("s1", "quicksort.");

        assert_eq!(tracker.text("s1"), Some("Here is quicksort."));
    }

    #[test]
    fn start_records_prompt_unless_from_command_log() {
        let (mut tracker, sink) = new_tracker();
        tracker.start("s1", Some("explain closures"), false);

        let has_prompt_entry = sink.events().iter().any(|e| {
            matches!(e, SessionEvent::CommandLog { entry }
                if entry.kind == ReasoningKind::User
                    && entry.lines == vec!["explain closures".to_string()])
        });
        assert!(has_prompt_entry);

        let (mut tracker, sink) = new_tracker();
        tracker.start("s2", Some("explain closures"), true);
        assert!(!sink
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::CommandLog { .. })));
    }

    #[test]
    fn start_is_idempotent_for_in_flight_ids() {
        let (mut tracker, _sink) = new_tracker();
        tracker.start("s1", None, true);
        tracker.chunk("s1", "kept");
        tracker.start("s1", None, true);

        assert_eq!(tracker.text("s1"), Some("kept"));
    }

    #[test]
    fn chunk_before_start_self_heals() {
        let (mut tracker, sink) = new_tracker();
        tracker.chunk("ghost", "early");

        assert!(tracker.is_active("ghost"));
        assert_eq!(tracker.text("ghost"), Some("early"));
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, SessionEvent::AnswerStarted { session_id } if session_id == "ghost")));
    }

    #[test]
    fn complete_drops_tracking_and_reports_full_text() {
        let (mut tracker, sink) = new_tracker();
        tracker.start("s1", None, true);
        tracker.chunk("s1", "done");
        tracker.complete("s1");

        assert!(!tracker.is_active("s1"));
        assert!(sink.events().iter().any(|e| {
            matches!(e, SessionEvent::AnswerCompleted { session_id, text }
                if session_id == "s1" && text == "done")
        }));

        // A fresh session may now reuse the id.
        tracker.start("s1", None, true);
        assert_eq!(tracker.text("s1"), Some(""));
    }

    #[test]
    fn fail_appends_message_to_displayed_text() {
        let (mut tracker, sink) = new_tracker();
        tracker.start("s1", None, true);
        tracker.chunk("s1", "partial answer");
        tracker.fail("s1", "connection reset");

        assert!(!tracker.is_active("s1"));
        assert!(sink.events().iter().any(|e| {
            matches!(e, SessionEvent::AnswerFailed { text, message, .. }
                if text == "partial answer\nconnection reset" && message == "connection reset")
        }));
    }

    #[test]
    fn terminal_events_for_unknown_ids_are_noops() {
        let (mut tracker, sink) = new_tracker();
        tracker.complete("nope");
        tracker.fail("nope", "boom");
        assert!(sink.events().is_empty());
    }
}
