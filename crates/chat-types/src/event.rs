use serde::{Deserialize, Serialize};
use crate::message::Sender;

/// Events emitted by the chat controller.
/// UI subscribes to these for reactive updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChatEvent {
    /// A conversation identifier became active
    SessionStarted { session_id: String, restored: bool },

    /// History request issued for a session
    HistoryRequested { session_id: String },

    /// History replaced the local transcript
    HistoryLoaded { session_id: String, count: usize },

    /// History request failed; transcript left as it was
    HistoryFetchFailed { session_id: String, message: String },

    /// A message was appended to the transcript
    MessageAppended { sender: Sender, text: String },

    /// A user message is waiting for the backend
    AwaitingResponse { session_id: String },

    /// The backend replied to the pending message
    ResponseReceived { session_id: String },

    /// The pending message could not be delivered
    MessageSendFailed { session_id: String, message: String },

    /// Transcript and history labels were cleared for a new conversation
    ConversationReset { session_id: String },
}

impl ChatEvent {
    /// Conversation the event belongs to, `None` for transcript appends
    /// which always concern the active one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            ChatEvent::SessionStarted { session_id, .. }
            | ChatEvent::HistoryRequested { session_id }
            | ChatEvent::HistoryLoaded { session_id, .. }
            | ChatEvent::HistoryFetchFailed { session_id, .. }
            | ChatEvent::AwaitingResponse { session_id }
            | ChatEvent::ResponseReceived { session_id }
            | ChatEvent::MessageSendFailed { session_id, .. }
            | ChatEvent::ConversationReset { session_id } => Some(session_id),
            ChatEvent::MessageAppended { .. } => None,
        }
    }
}
