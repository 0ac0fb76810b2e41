use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// The backend still labels its own replies `"bot"` in stored history.
    #[serde(alias = "bot")]
    Assistant,
}

impl Sender {
    pub fn label(&self) -> &str {
        match self {
            Sender::User => "You",
            Sender::Assistant => "Assistant",
        }
    }
}

/// A single message in a transcript. Its ordinal is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// One entry in the sidebar history list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLabel {
    pub id: u64,
    pub text: String,
}

impl HistoryLabel {
    /// Label shortened to `max_chars` characters, with `...` appended when cut.
    pub fn truncated(&self, max_chars: usize) -> String {
        truncate_label(&self.text, max_chars)
    }
}

/// Cut `text` to at most `max_chars` characters (not bytes), marking the cut.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
