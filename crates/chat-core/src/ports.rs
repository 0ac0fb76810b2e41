//! Port traits: the hexagonal architecture boundary.
//!
//! Defined here in `chat-core` (pure Rust). Browser implementations live
//! in `chat-platform`; tests supply their own mocks.

use std::cell::RefCell;
use std::rc::Rc;
use async_trait::async_trait;
use chat_types::{
    Result,
    api::{ChatQuery, ChatReply, ForgotPasswordRequest, LoginReply, LoginRequest,
          OtpVerification, OtpVerified, RegisterRequest, ResendOtpRequest,
          ResetPasswordRequest, StatusReply},
    message::Message,
    session::SessionId,
};
use crate::cooldown::Cooldown;

// ─── Key/Value Store Port ────────────────────────────────────

/// Synchronous string slots, e.g. `sessionStorage` / `localStorage`.
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

// ─── Chat Backend Port ───────────────────────────────────────

#[async_trait(?Send)]
pub trait ChatBackend {
    /// Stored transcript for a session, oldest first
    async fn fetch_history(&self, session_id: &SessionId) -> Result<Vec<Message>>;

    /// Submit one user query and wait for the reply
    async fn send_query(&self, query: ChatQuery) -> Result<ChatReply>;
}

// ─── Auth Backend Port ───────────────────────────────────────

#[async_trait(?Send)]
pub trait AuthBackend {
    async fn login(&self, req: LoginRequest) -> Result<LoginReply>;

    async fn register(&self, req: RegisterRequest) -> Result<()>;

    async fn verify_otp(&self, req: OtpVerification) -> Result<OtpVerified>;

    async fn resend_otp(&self, req: ResendOtpRequest) -> Result<()>;

    /// Mail a reset link to `req.email`
    async fn forgot_password(&self, req: ForgotPasswordRequest) -> Result<StatusReply>;

    async fn reset_password(&self, req: ResetPasswordRequest) -> Result<StatusReply>;
}

// ─── Timer Port ──────────────────────────────────────────────

pub type SharedCooldown = Rc<RefCell<Cooldown>>;

/// Delivers one `tick()` per second to a cooldown until it goes inactive
/// or is restarted.
pub trait CooldownDriver {
    fn drive(&self, cooldown: SharedCooldown);
}
