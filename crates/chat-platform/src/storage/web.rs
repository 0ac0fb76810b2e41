//! `sessionStorage` / `localStorage` backend.

use chat_core::ports::SessionStore;
use chat_types::{ChatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebStorageKind {
    /// Survives reloads of this tab only
    Session,
    /// Survives browser restarts
    Local,
}

impl WebStorageKind {
    pub fn name(&self) -> &'static str {
        match self {
            WebStorageKind::Session => "sessionStorage",
            WebStorageKind::Local => "localStorage",
        }
    }
}

pub struct WebStorage {
    storage: web_sys::Storage,
    kind: WebStorageKind,
}

impl WebStorage {
    /// Fails when there is no window or the browser blocks storage access
    /// (private mode, sandboxed iframes).
    pub fn open(kind: WebStorageKind) -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| ChatError::Storage("No window object".to_string()))?;

        let storage = match kind {
            WebStorageKind::Session => window.session_storage(),
            WebStorageKind::Local => window.local_storage(),
        }
        .map_err(|e| ChatError::Storage(format!("{:?}", e)))?
        .ok_or_else(|| ChatError::Storage(format!("{} not available", kind.name())))?;

        Ok(Self { storage, kind })
    }
}

impl SessionStore for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Throws when the quota is exceeded
        self.storage
            .set_item(key, value)
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| ChatError::Storage(format!("{:?}", e)))
    }

    fn backend_name(&self) -> &str {
        self.kind.name()
    }
}
