//! Pick the Web Storage area, or memory when the browser refuses it.

use std::rc::Rc;
use chat_core::ports::SessionStore;
use super::{MemoryStore, WebStorage, WebStorageKind};

/// Tab-scoped store for the session identifier and the login email.
pub fn session_store() -> Rc<dyn SessionStore> {
    open_or_memory(WebStorageKind::Session)
}

/// Long-lived store for the auth token and client configuration.
pub fn persistent_store() -> Rc<dyn SessionStore> {
    open_or_memory(WebStorageKind::Local)
}

fn open_or_memory(kind: WebStorageKind) -> Rc<dyn SessionStore> {
    match WebStorage::open(kind) {
        Ok(storage) => {
            log::info!("Storage backend: {}", kind.name());
            Rc::new(storage)
        }
        Err(e) => {
            log::warn!("{} unavailable ({}), falling back to memory", kind.name(), e);
            Rc::new(MemoryStore::new())
        }
    }
}
