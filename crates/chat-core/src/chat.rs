//! Chat transcript controller.
//!
//! Every operation is a two-phase mutation around a single network await:
//! 1. synchronous local change (optimistic user message, state transition)
//! 2. the backend call, with no `RefCell` borrow held
//! 3. synchronous reconciliation that appends exactly one more entry
//!
//! Failures never escape to the caller. They end up as a transcript entry,
//! a state change and an event on the bus.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::{
    api::ChatQuery,
    config::ClientConfig,
    event::ChatEvent,
    message::{HistoryLabel, Message, Sender},
    session::SessionId,
};
use crate::event_bus::EventBus;
use crate::ports::ChatBackend;
use crate::session::SessionManager;
use crate::transcript::{HistoryLabels, Transcript};

/// Appended when the backend cannot be reached or rejects the query
pub const SEND_FAILED_TEXT: &str = "Error: Unable to get a response from the server.";
/// Appended when the backend answers without reply text
pub const EMPTY_REPLY_TEXT: &str = "No response from AI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    LoadingHistory,
    AwaitingResponse,
    Error(String),
}

/// What `submit_message` ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank input, nothing sent
    Ignored,
    /// Another request is still in flight for this session
    Busy,
    /// Reply appended
    Delivered,
    /// Error entry appended
    Failed,
    /// The conversation was reset before the reply arrived
    Discarded,
}

struct Inner {
    session_id: SessionId,
    user_id: String,
    transcript: Transcript,
    labels: HistoryLabels,
    state: ChatState,
    /// Bumped on every reset; replies tagged with an older value are dropped
    generation: u64,
    restored: bool,
}

/// Clone-cheap handle; all clones share one transcript.
#[derive(Clone)]
pub struct ChatController {
    inner: Rc<RefCell<Inner>>,
    sessions: Rc<SessionManager>,
    backend: Rc<dyn ChatBackend>,
    event_bus: EventBus,
    title_max_chars: usize,
}

impl ChatController {
    /// Opens (or creates) the session identifier. A restored identifier puts
    /// the controller in `LoadingHistory` until `start` fetches it.
    pub fn new(
        sessions: SessionManager,
        backend: Rc<dyn ChatBackend>,
        event_bus: EventBus,
        config: &ClientConfig,
    ) -> Self {
        let origin = sessions.open();
        let restored = origin.is_restored();
        let session_id = origin.into_id();

        event_bus.emit(ChatEvent::SessionStarted {
            session_id: session_id.to_string(),
            restored,
        });

        Self {
            inner: Rc::new(RefCell::new(Inner {
                session_id,
                user_id: config.user_id.clone(),
                transcript: Transcript::new(),
                labels: HistoryLabels::new(),
                state: if restored { ChatState::LoadingHistory } else { ChatState::Idle },
                generation: 0,
                restored,
            })),
            sessions: Rc::new(sessions),
            backend,
            event_bus,
            title_max_chars: config.title_max_chars,
        }
    }

    /// Load history once if the session was restored. A fresh session has
    /// nothing on the server, so no request is made.
    pub async fn start(&self) {
        let restored = {
            let mut inner = self.inner.borrow_mut();
            if inner.restored {
                inner.restored = false;
                Some(inner.session_id.clone())
            } else {
                None
            }
        };
        if let Some(session_id) = restored {
            self.load_history(session_id).await;
        }
    }

    /// Replace the transcript with the server's copy. On failure the current
    /// transcript is kept and the state becomes `Error`. Skipped while a
    /// reply is pending, since the overwrite would race the append.
    pub async fn load_history(&self, session_id: SessionId) {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == ChatState::AwaitingResponse {
                log::debug!("Not loading history for {} while a reply is pending", session_id);
                return;
            }
            inner.state = ChatState::LoadingHistory;
            inner.generation
        };
        self.event_bus.emit(ChatEvent::HistoryRequested {
            session_id: session_id.to_string(),
        });

        let result = self.backend.fetch_history(&session_id).await;

        let mut inner = self.inner.borrow_mut();
        if inner.generation != generation {
            log::debug!("Dropping history of superseded session {}", session_id);
            return;
        }

        match result {
            Ok(messages) => {
                let count = messages.len();
                inner.transcript.replace(messages);
                let Inner { transcript, labels, .. } = &mut *inner;
                labels.rebuild_from(transcript.messages());
                inner.state = ChatState::Idle;
                log::info!("Loaded {} messages for session {}", count, session_id);
                self.event_bus.emit(ChatEvent::HistoryLoaded {
                    session_id: session_id.to_string(),
                    count,
                });
            }
            Err(e) => {
                log::warn!("Error fetching chat history for {}: {}", session_id, e);
                inner.state = ChatState::Error(e.to_string());
                self.event_bus.emit(ChatEvent::HistoryFetchFailed {
                    session_id: session_id.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Append the user's message right away, then the backend's answer (or an
    /// error entry) once the request settles.
    pub async fn submit_message(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Ignored;
        }

        let (query, generation) = {
            let mut inner = self.inner.borrow_mut();
            if matches!(inner.state, ChatState::AwaitingResponse | ChatState::LoadingHistory) {
                log::debug!("Rejecting submission while {:?}", inner.state);
                return SubmitOutcome::Busy;
            }
            inner.transcript.push(Message::user(text));
            inner.labels.push(text);
            inner.state = ChatState::AwaitingResponse;
            (
                ChatQuery::new(text, inner.session_id.clone(), inner.user_id.clone()),
                inner.generation,
            )
        };
        let session_id = query.session_id.to_string();
        self.event_bus.emit(ChatEvent::MessageAppended {
            sender: Sender::User,
            text: text.to_string(),
        });
        self.event_bus.emit(ChatEvent::AwaitingResponse {
            session_id: session_id.clone(),
        });

        let result = self.backend.send_query(query).await;

        let mut inner = self.inner.borrow_mut();
        if inner.generation != generation {
            log::debug!("Dropping reply for superseded session {}", session_id);
            return SubmitOutcome::Discarded;
        }

        match result {
            Ok(reply) => {
                let answer = reply.text().unwrap_or(EMPTY_REPLY_TEXT).to_string();
                inner.transcript.push(Message::assistant(answer.clone()));
                inner.state = ChatState::Idle;
                self.event_bus.emit(ChatEvent::ResponseReceived { session_id });
                self.event_bus.emit(ChatEvent::MessageAppended {
                    sender: Sender::Assistant,
                    text: answer,
                });
                SubmitOutcome::Delivered
            }
            Err(e) => {
                log::error!("Error sending message: {}", e);
                inner.transcript.push(Message::assistant(SEND_FAILED_TEXT));
                inner.state = ChatState::Error(e.to_string());
                self.event_bus.emit(ChatEvent::MessageSendFailed {
                    session_id,
                    message: e.to_string(),
                });
                self.event_bus.emit(ChatEvent::MessageAppended {
                    sender: Sender::Assistant,
                    text: SEND_FAILED_TEXT.to_string(),
                });
                // Failures never lock the input.
                inner.state = ChatState::Idle;
                SubmitOutcome::Failed
            }
        }
    }

    /// Rotate the session identifier and start from an empty transcript.
    pub fn start_new_conversation(&self) -> SessionId {
        let session_id = self.sessions.start_new();
        {
            let mut inner = self.inner.borrow_mut();
            inner.session_id = session_id.clone();
            inner.transcript.clear();
            inner.labels.clear();
            inner.state = ChatState::Idle;
            inner.generation += 1;
            inner.restored = false;
        }
        self.event_bus.emit(ChatEvent::ConversationReset {
            session_id: session_id.to_string(),
        });
        self.event_bus.emit(ChatEvent::SessionStarted {
            session_id: session_id.to_string(),
            restored: false,
        });
        session_id
    }

    /// Sidebar labels, truncated for display. Read-only.
    pub fn derive_titles(&self) -> Vec<HistoryLabel> {
        self.inner.borrow().labels.titles(self.title_max_chars)
    }

    /// Drop one sidebar label. The transcript and the server are untouched.
    pub fn remove_history_entry(&self, id: u64) -> bool {
        self.inner.borrow_mut().labels.remove(id)
    }

    pub fn set_user_id(&self, user_id: impl Into<String>) {
        self.inner.borrow_mut().user_id = user_id.into();
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.borrow().session_id.clone()
    }

    pub fn state(&self) -> ChatState {
        self.inner.borrow().state.clone()
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.inner.borrow().state,
            ChatState::AwaitingResponse | ChatState::LoadingHistory
        )
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.inner.borrow().transcript.messages().to_vec()
    }

    /// Borrow the transcript without cloning it (for rendering).
    pub fn with_transcript<R>(&self, f: impl FnOnce(&[Message]) -> R) -> R {
        f(self.inner.borrow().transcript.messages())
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().transcript.is_empty()
    }
}
