//! Request and response bodies of the backend REST API.

use serde::{Deserialize, Serialize};
use crate::{ChatError, Result};
use crate::message::Message;
use crate::session::SessionId;

// ─── Chat ────────────────────────────────────────────────────

/// `GET /api/chat/history/?session_id=…`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<Message>>,
}

impl HistoryResponse {
    /// The stored messages. A body without a `history` list is malformed,
    /// not an empty conversation.
    pub fn into_messages(self) -> Result<Vec<Message>> {
        self.history
            .ok_or_else(|| ChatError::Serialization("history missing from response".to_string()))
    }
}

/// `POST /api/chat/` body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatQuery {
    pub query: String,
    pub session_id: SessionId,
    pub user_id: String,
    /// RFC 3339, UTC
    pub timestamp: String,
}

impl ChatQuery {
    pub fn new(query: impl Into<String>, session_id: SessionId, user_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id,
            user_id: user_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// `POST /api/chat/` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatReply {
    /// The reply text, if the backend actually sent one.
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().filter(|t| !t.is_empty())
    }
}

// ─── Auth ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpVerification {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtpVerified {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

// ─── Password recovery ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// `token` comes from the emailed `/reset-password/{token}` link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// `{message}` acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusReply {
    pub fn text(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

// ─── Errors ──────────────────────────────────────────────────

/// Body of a non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<ErrorDetail>,
}

/// `detail` comes back as a plain string, a `{msg}` object or a list of
/// `{msg}` objects depending on which layer of the backend rejected the call.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Text(String),
    Item(DetailItem),
    List(Vec<DetailItem>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailItem {
    pub msg: String,
}

impl ErrorDetail {
    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorDetail::Text(s) => Some(s.as_str()),
            ErrorDetail::Item(item) => Some(item.msg.as_str()),
            ErrorDetail::List(items) => items.first().map(|i| i.msg.as_str()),
        }
    }
}

impl ErrorBody {
    /// Parse a raw error body, tolerating non-JSON payloads.
    pub fn parse(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }

    pub fn message(&self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(|d| d.message())
            .filter(|m| !m.is_empty())
            .map(String::from)
    }
}
