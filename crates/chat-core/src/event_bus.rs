//! Event bus between the chat controller and the UI.
//!
//! Single-threaded (WASM constraint), interior mutability via RefCell.
//! The controller emits as it mutates; the UI drains once per frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use chat_types::event::ChatEvent;

/// Shared event bus, clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<ChatEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn emit(&self, event: ChatEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    /// Drain all pending events, oldest first.
    pub fn drain(&self) -> Vec<ChatEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    /// Drain pending events, dropping the ones tagged with a conversation
    /// other than `session_id`. Events queued before a "New Chat" in the
    /// same frame would otherwise repaint the old session's status.
    pub fn drain_for(&self, session_id: &str) -> Vec<ChatEvent> {
        let mut stale = 0usize;
        let events: Vec<ChatEvent> = self
            .drain()
            .into_iter()
            .filter(|e| match e.session_id() {
                Some(id) if id != session_id => {
                    stale += 1;
                    false
                }
                _ => true,
            })
            .collect();
        if stale > 0 {
            log::debug!("Dropped {} events of superseded sessions", stale);
        }
        events
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
