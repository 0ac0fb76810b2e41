//! Local transcript and the sidebar label list derived from it.
//!
//! The two are deliberately independent: removing a label never touches the
//! transcript.

use chat_types::message::{HistoryLabel, Message};

/// Ordered messages of one conversation, oldest first.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Full overwrite with the server's copy.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// One label per exchange, keyed by a never-reused id.
#[derive(Debug, Clone, Default)]
pub struct HistoryLabels {
    labels: Vec<HistoryLabel>,
    next_id: u64,
}

impl HistoryLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.labels.push(HistoryLabel { id, text: text.into() });
        id
    }

    /// Replace all labels with one per user message in `messages`.
    pub fn rebuild_from(&mut self, messages: &[Message]) {
        self.labels.clear();
        for msg in messages.iter().filter(|m| m.is_user()) {
            self.push(msg.text.clone());
        }
    }

    /// Returns false when no label has this id.
    pub fn remove(&mut self, id: u64) -> bool {
        match self.labels.iter().position(|l| l.id == id) {
            Some(idx) => {
                self.labels.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Display copies with long text truncated.
    pub fn titles(&self, max_chars: usize) -> Vec<HistoryLabel> {
        self.labels
            .iter()
            .map(|l| HistoryLabel {
                id: l.id,
                text: l.truncated(max_chars),
            })
            .collect()
    }
}
