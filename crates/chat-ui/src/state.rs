//! UI-level state that drives rendering.
//! Form inputs plus a projection of controller events; the transcript and
//! labels themselves are read straight from the controller each frame.

use chat_types::event::ChatEvent;

/// Which screen is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Register,
    /// Request a reset link by email
    ForgotPassword,
    /// Choose a new password with the token from that link
    ResetPassword,
    Mfa,
    Chat,
}

/// Text fields of the login and registration forms
#[derive(Debug, Clone, Default)]
pub struct CredentialsForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl CredentialsForm {
    pub fn can_login(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    pub fn can_register(&self) -> bool {
        !self.name.trim().is_empty() && self.can_login()
    }

    /// Drop the password once it has been sent.
    pub fn clear_secret(&mut self) {
        self.password.clear();
    }
}

/// Fields of the password recovery screens
#[derive(Debug, Clone, Default)]
pub struct RecoveryForm {
    pub email: String,
    pub token: String,
    pub new_password: String,
}

impl RecoveryForm {
    pub fn can_request(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn can_reset(&self) -> bool {
        !self.token.trim().is_empty() && !self.new_password.is_empty()
    }
}

/// Token from a `/reset-password/{token}` page path, as in the emailed link.
pub fn reset_token_from_path(path: &str) -> Option<String> {
    let token = path
        .trim_end_matches('/')
        .strip_prefix("/reset-password/")?;
    if token.is_empty() || token.contains('/') {
        return None;
    }
    Some(token.to_string())
}

/// State visible to UI panels
pub struct UiState {
    pub screen: Screen,
    pub credentials: CredentialsForm,
    pub recovery: RecoveryForm,
    pub otp_input: String,
    /// Chat input field content
    pub input_text: String,
    /// Set while history loads or a reply is pending
    pub waiting: bool,
    /// Active conversation identifier, for the header
    pub session_label: String,
    /// Status line text
    pub status_text: String,
    /// An auth request is in flight
    pub form_pending: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Login,
            credentials: CredentialsForm::default(),
            recovery: RecoveryForm::default(),
            otp_input: String::new(),
            input_text: String::new(),
            waiting: false,
            session_label: String::new(),
            status_text: "Ready".to_string(),
            form_pending: false,
        }
    }

    /// Process events from the EventBus and update UI state
    pub fn process_events(&mut self, events: Vec<ChatEvent>) {
        for event in events {
            match event {
                ChatEvent::SessionStarted { session_id, restored } => {
                    self.session_label = session_id;
                    if !restored {
                        self.status_text = "Ready".to_string();
                    }
                }
                ChatEvent::HistoryRequested { .. } => {
                    self.waiting = true;
                    self.status_text = "Loading history...".to_string();
                }
                ChatEvent::HistoryLoaded { count, .. } => {
                    self.waiting = false;
                    self.status_text = format!("Loaded {} messages", count);
                }
                ChatEvent::HistoryFetchFailed { .. } => {
                    self.waiting = false;
                    self.status_text = "History unavailable".to_string();
                }
                ChatEvent::AwaitingResponse { .. } => {
                    self.waiting = true;
                    self.status_text = "Thinking...".to_string();
                }
                ChatEvent::ResponseReceived { .. } => {
                    self.waiting = false;
                    self.status_text = "Ready".to_string();
                }
                ChatEvent::MessageSendFailed { message, .. } => {
                    self.waiting = false;
                    self.status_text = format!("Error: {}", message);
                }
                ChatEvent::ConversationReset { .. } => {
                    self.waiting = false;
                    self.input_text.clear();
                    self.status_text = "New conversation".to_string();
                }
                ChatEvent::MessageAppended { .. } => {}
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.waiting
    }

    /// Switch screens, dropping input that belongs to the previous one.
    pub fn go_to(&mut self, screen: Screen) {
        match screen {
            Screen::Mfa => self.credentials.clear_secret(),
            Screen::Login => {
                self.otp_input.clear();
                self.input_text.clear();
                self.recovery.new_password.clear();
            }
            Screen::ForgotPassword => {
                if self.recovery.email.is_empty() {
                    self.recovery.email = self.credentials.email.trim().to_string();
                }
            }
            Screen::Register | Screen::ResetPassword | Screen::Chat => {}
        }
        log::debug!("Screen {:?} -> {:?}", self.screen, screen);
        self.form_pending = false;
        self.screen = screen;
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
