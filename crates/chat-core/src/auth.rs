//! Login, MFA and password recovery.
//!
//! Thin pass-through to the auth backend. What it adds is the form-level
//! feedback strings and the resend cooldown.

use std::cell::RefCell;
use std::rc::Rc;

use chat_types::{
    ChatError,
    api::{ForgotPasswordRequest, LoginRequest, OtpVerification, RegisterRequest,
          ResendOtpRequest, ResetPasswordRequest},
    config::{ClientConfig, StorageKeys},
};
use crate::cooldown::{Cooldown, CooldownState};
use crate::ports::{AuthBackend, CooldownDriver, SessionStore, SharedCooldown};

pub const LOGIN_FAILED: &str = "Login failed";
pub const LOGIN_ERROR: &str = "An error occurred during login";
pub const REGISTER_FAILED: &str = "Registration failed";
pub const REGISTER_ERROR: &str = "An error occurred during registration";
pub const REGISTERED: &str = "Registration successful";
pub const OTP_REQUIRED: &str = "Please enter the OTP.";
pub const OTP_INVALID: &str = "Invalid OTP. Please try again.";
pub const OTP_RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";
pub const OTP_RESENT: &str = "A new OTP has been sent to your email.";
pub const EMAIL_MISSING: &str = "Email is missing. Please login again.";
pub const SOMETHING_WRONG: &str = "Something went wrong. Please try again later.";
pub const EMAIL_REQUIRED: &str = "Please enter your email.";
pub const RESET_LINK_SENT: &str = "Password reset link sent to email";
pub const RESET_LINK_FAILED: &str = "Failed to send reset link. Please try again.";
pub const RESET_TOKEN_MISSING: &str = "The reset link is incomplete. Request a new one.";
pub const PASSWORD_REQUIRED: &str = "Please enter a new password.";
pub const PASSWORD_RESET: &str = "Password reset successful";
pub const RESET_FAILED: &str = "Invalid or expired token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Success,
    Failed,
    /// Validation or cooldown stopped the request before it was sent
    Skipped,
}

/// Messages shown next to the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFeedback {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Clone-cheap handle; clones share feedback and cooldown.
#[derive(Clone)]
pub struct AuthFlow {
    backend: Rc<dyn AuthBackend>,
    /// Session-scoped slots (email)
    session_store: Rc<dyn SessionStore>,
    /// Persistent slots (auth token)
    persistent_store: Rc<dyn SessionStore>,
    keys: StorageKeys,
    cooldown: SharedCooldown,
    driver: Rc<dyn CooldownDriver>,
    cooldown_secs: u32,
    feedback: Rc<RefCell<FormFeedback>>,
}

impl AuthFlow {
    pub fn new(
        backend: Rc<dyn AuthBackend>,
        session_store: Rc<dyn SessionStore>,
        persistent_store: Rc<dyn SessionStore>,
        driver: Rc<dyn CooldownDriver>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            backend,
            session_store,
            persistent_store,
            keys: config.storage_keys.clone(),
            cooldown: Rc::new(RefCell::new(Cooldown::new())),
            driver,
            cooldown_secs: config.resend_cooldown_secs,
            feedback: Rc::new(RefCell::new(FormFeedback::default())),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> FlowOutcome {
        self.clear_feedback();
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        match self.backend.login(req).await {
            Ok(reply) => {
                let email = reply.email.unwrap_or_else(|| email.trim().to_string());
                if let Err(e) = self.session_store.set(&self.keys.email, &email) {
                    log::warn!("Could not remember email for MFA: {}", e);
                }
                log::info!("Login accepted, OTP requested for {}", email);
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("Error during login: {}", e);
                self.set_error(rejection_message(&e, LOGIN_FAILED, LOGIN_ERROR));
                FlowOutcome::Failed
            }
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> FlowOutcome {
        self.clear_feedback();
        let req = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        match self.backend.register(req).await {
            Ok(()) => {
                self.set_success(REGISTERED);
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("Error during registration: {}", e);
                self.set_error(rejection_message(&e, REGISTER_FAILED, REGISTER_ERROR));
                FlowOutcome::Failed
            }
        }
    }

    /// Check the one-time passcode; on success the returned token is stored.
    pub async fn verify_otp(&self, otp: &str) -> FlowOutcome {
        self.clear_feedback();
        let otp = otp.trim();
        if otp.is_empty() {
            self.set_error(OTP_REQUIRED);
            return FlowOutcome::Skipped;
        }

        let req = OtpVerification {
            email: self.email(),
            otp: otp.to_string(),
        };
        match self.backend.verify_otp(req).await {
            Ok(verified) => {
                if let Some(token) = verified.token {
                    if let Err(e) = self.persistent_store.set(&self.keys.auth_token, &token) {
                        log::warn!("Could not store auth token: {}", e);
                    }
                }
                log::info!("MFA verified");
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("OTP verification failed: {}", e);
                self.set_error(rejection_message(&e, OTP_INVALID, SOMETHING_WRONG));
                FlowOutcome::Failed
            }
        }
    }

    /// Ask for a new passcode. Refused while the cooldown runs; a failed
    /// request cancels the cooldown so the user can retry at once.
    pub async fn resend_otp(&self) -> FlowOutcome {
        if self.cooldown.borrow().is_active() {
            log::debug!("Resend refused, cooldown active");
            return FlowOutcome::Skipped;
        }
        self.cooldown.borrow_mut().start(self.cooldown_secs);
        self.driver.drive(self.cooldown.clone());
        self.clear_feedback();

        let email = self.email();
        let email = email.trim();
        if email.is_empty() {
            self.set_error(EMAIL_MISSING);
            return FlowOutcome::Failed;
        }

        let req = ResendOtpRequest {
            email: email.to_string(),
        };
        match self.backend.resend_otp(req).await {
            Ok(()) => {
                self.set_success(OTP_RESENT);
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("Error resending OTP: {}", e);
                self.set_error(rejection_message(&e, OTP_RESEND_FAILED, SOMETHING_WRONG));
                self.cooldown.borrow_mut().cancel();
                FlowOutcome::Failed
            }
        }
    }

    /// Ask the backend to mail a reset link.
    pub async fn forgot_password(&self, email: &str) -> FlowOutcome {
        self.clear_feedback();
        let email = email.trim();
        if email.is_empty() {
            self.set_error(EMAIL_REQUIRED);
            return FlowOutcome::Skipped;
        }

        let req = ForgotPasswordRequest {
            email: email.to_string(),
        };
        match self.backend.forgot_password(req).await {
            Ok(reply) => {
                log::info!("Password reset link requested for {}", email);
                self.set_success(reply.text().unwrap_or(RESET_LINK_SENT));
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("Error requesting password reset: {}", e);
                self.set_error(rejection_message(&e, RESET_LINK_FAILED, SOMETHING_WRONG));
                FlowOutcome::Failed
            }
        }
    }

    /// Set a new password with the token from the emailed link. Does not
    /// sign in; the user logs in again with the new password.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> FlowOutcome {
        self.clear_feedback();
        let token = token.trim();
        if token.is_empty() {
            self.set_error(RESET_TOKEN_MISSING);
            return FlowOutcome::Skipped;
        }
        if new_password.is_empty() {
            self.set_error(PASSWORD_REQUIRED);
            return FlowOutcome::Skipped;
        }

        let req = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        match self.backend.reset_password(req).await {
            Ok(reply) => {
                log::info!("Password reset accepted");
                self.set_success(reply.text().unwrap_or(PASSWORD_RESET));
                FlowOutcome::Success
            }
            Err(e) => {
                log::error!("Error resetting password: {}", e);
                self.set_error(rejection_message(&e, RESET_FAILED, SOMETHING_WRONG));
                FlowOutcome::Failed
            }
        }
    }

    /// Forget the auth token. The session-scoped slots are left alone.
    pub fn logout(&self) {
        if let Err(e) = self.persistent_store.remove(&self.keys.auth_token) {
            log::warn!("Could not clear auth token: {}", e);
        }
        self.clear_feedback();
        log::info!("Signed out");
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.persistent_store.get(&self.keys.auth_token), Ok(Some(t)) if !t.is_empty())
    }

    /// Email remembered from login, empty when there is none.
    pub fn email(&self) -> String {
        self.session_store
            .get(&self.keys.email)
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn cooldown(&self) -> CooldownState {
        self.cooldown.borrow().state()
    }

    pub fn feedback(&self) -> FormFeedback {
        self.feedback.borrow().clone()
    }

    pub fn clear_feedback(&self) {
        *self.feedback.borrow_mut() = FormFeedback::default();
    }

    fn set_error(&self, message: impl Into<String>) {
        self.feedback.borrow_mut().error = Some(message.into());
    }

    fn set_success(&self, message: impl Into<String>) {
        self.feedback.borrow_mut().success = Some(message.into());
    }
}

/// Backend-supplied detail for a rejected request, `rejected` when it sent
/// none, `unreachable` when there was no usable response at all.
fn rejection_message(err: &ChatError, rejected: &str, unreachable: &str) -> String {
    match (err, err.detail()) {
        (_, Some(detail)) => detail.to_string(),
        (ChatError::Http { .. }, None) => rejected.to_string(),
        _ => unreachable.to_string(),
    }
}
