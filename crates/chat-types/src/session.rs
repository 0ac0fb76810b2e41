use std::fmt;
use serde::{Deserialize, Serialize};

/// Opaque key addressing one conversation's transcript on the backend.
///
/// Generated client-side. Not a secret: it only selects which stored
/// transcript the backend returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier, e.g. one read back from storage.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier: 64 bits of a v4 UUID rendered in base 36.
    pub fn generate() -> Self {
        let (high, _) = uuid::Uuid::new_v4().as_u64_pair();
        Self(to_base36(high))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub(crate) fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    // Every byte comes from BASE36_DIGITS, so this is always ASCII.
    String::from_utf8_lossy(&digits).into_owned()
}

/// Whether `ensure_session` found an identifier or had to make one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOrigin {
    Restored(SessionId),
    Created(SessionId),
}

impl SessionOrigin {
    pub fn id(&self) -> &SessionId {
        match self {
            SessionOrigin::Restored(id) | SessionOrigin::Created(id) => id,
        }
    }

    pub fn into_id(self) -> SessionId {
        match self {
            SessionOrigin::Restored(id) | SessionOrigin::Created(id) => id,
        }
    }

    pub fn is_restored(&self) -> bool {
        matches!(self, SessionOrigin::Restored(_))
    }
}

