//! Session identity: which backend transcript this tab is talking to.
//!
//! The identifier lives in a session-scoped store so it survives reloads but
//! not browser restarts. When the store misbehaves the manager degrades to
//! handing out a fresh identifier per call instead of failing.

use std::cell::RefCell;
use std::rc::Rc;
use chat_types::session::{SessionId, SessionOrigin};
use crate::ports::SessionStore;

pub struct SessionManager {
    store: Rc<dyn SessionStore>,
    key: String,
    /// Last identifier handed out, so rotation differs even without storage
    last: RefCell<Option<SessionId>>,
}

impl SessionManager {
    pub fn new(store: Rc<dyn SessionStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            last: RefCell::new(None),
        }
    }

    /// Return the stored identifier, or create and persist one.
    pub fn ensure_session(&self) -> SessionId {
        self.open().into_id()
    }

    /// Like `ensure_session`, but reports whether the identifier was found.
    pub fn open(&self) -> SessionOrigin {
        let origin = match self.store.get(&self.key) {
            Ok(Some(id)) if !id.is_empty() => SessionOrigin::Restored(SessionId::new(id)),
            Ok(_) => {
                let id = SessionId::generate();
                self.persist(&id);
                log::info!("Created chat session {}", id);
                SessionOrigin::Created(id)
            }
            Err(e) => {
                log::warn!(
                    "Session store {} unavailable ({}), using an ephemeral session id",
                    self.store.backend_name(),
                    e
                );
                SessionOrigin::Created(SessionId::generate())
            }
        };
        *self.last.borrow_mut() = Some(origin.id().clone());
        origin
    }

    /// Identifier currently in the store, without creating one.
    pub fn stored(&self) -> Option<SessionId> {
        match self.store.get(&self.key) {
            Ok(Some(id)) if !id.is_empty() => Some(SessionId::new(id)),
            _ => None,
        }
    }

    /// Unconditionally rotate to a new identifier. The caller owns clearing
    /// whatever transcript belonged to the old one.
    pub fn start_new(&self) -> SessionId {
        let stored = self.stored();
        let last = self.last.borrow().clone();
        let id = loop {
            let candidate = SessionId::generate();
            if Some(&candidate) != stored.as_ref() && Some(&candidate) != last.as_ref() {
                break candidate;
            }
        };
        self.persist(&id);
        log::info!("Rotated chat session to {}", id);
        *self.last.borrow_mut() = Some(id.clone());
        id
    }

    fn persist(&self, id: &SessionId) {
        if let Err(e) = self.store.set(&self.key, id.as_str()) {
            log::warn!("Could not persist session id to {}: {}", self.store.backend_name(), e);
        }
    }
}
