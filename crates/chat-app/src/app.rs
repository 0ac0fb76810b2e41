//! Main egui application: routes between the login, MFA and chat screens.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use egui::{self, CentralPanel, SidePanel};

use chat_core::auth::{AuthFlow, FlowOutcome};
use chat_core::chat::ChatController;
use chat_core::event_bus::EventBus;
use chat_core::ports::SessionStore;
use chat_core::session::SessionManager;
use chat_platform::http::RestBackend;
use chat_platform::storage::{persistent_store, session_store};
use chat_platform::timer::IntervalDriver;
use chat_types::config::{ClientConfig, StorageKeys};
use chat_ui::panels::chat::{self, ChatAction};
use chat_ui::panels::login::{self, LoginAction};
use chat_ui::panels::mfa::{self, MfaAction};
use chat_ui::panels::recovery::{self, RecoveryAction};
use chat_ui::state::{reset_token_from_path, Screen, UiState};
use chat_ui::theme;

/// Which auth request finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthStep {
    Login,
    Register,
    Verify,
    Resend,
    ForgotPassword,
    ResetPassword,
}

type AuthResults = Rc<RefCell<Vec<(AuthStep, FlowOutcome)>>>;

pub struct ChatApp {
    ui_state: UiState,
    event_bus: EventBus,
    controller: ChatController,
    auth: AuthFlow,
    /// Written by spawned auth tasks, read on the next frame
    auth_done: AuthResults,
    first_frame: bool,
}

impl ChatApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let session = session_store();
        let persistent = persistent_store();
        let config = load_config(persistent.as_ref());

        let backend = Rc::new(RestBackend::new(config.clone()));
        let event_bus = EventBus::new();
        let sessions = SessionManager::new(session.clone(), config.storage_keys.session_id.clone());
        let controller = ChatController::new(sessions, backend.clone(), event_bus.clone(), &config);
        let auth = AuthFlow::new(
            backend,
            session,
            persistent,
            Rc::new(IntervalDriver::new()),
            &config,
        );

        let mut app = Self {
            ui_state: UiState::new(),
            event_bus,
            controller,
            auth,
            auth_done: Rc::new(RefCell::new(Vec::new())),
            first_frame: true,
        };

        if let Some(token) = page_path().as_deref().and_then(reset_token_from_path) {
            log::info!("Opened from a password reset link");
            app.ui_state.recovery.token = token;
            app.ui_state.go_to(Screen::ResetPassword);
        } else if app.auth.is_authenticated() {
            log::info!("Existing auth token found, opening chat");
            app.enter_chat();
        }
        app
    }

    fn enter_chat(&mut self) {
        let email = self.auth.email();
        if !email.is_empty() {
            self.controller.set_user_id(email);
        }
        self.ui_state.go_to(Screen::Chat);

        let controller = self.controller.clone();
        wasm_bindgen_futures::spawn_local(async move {
            controller.start().await;
        });
    }

    fn sign_out(&mut self) {
        self.auth.logout();
        self.ui_state.go_to(Screen::Login);
    }

    /// Run one auth request in the background and record how it ended.
    fn spawn_auth<F, Fut>(&mut self, step: AuthStep, ctx: &egui::Context, run: F)
    where
        F: FnOnce(AuthFlow) -> Fut + 'static,
        Fut: std::future::Future<Output = FlowOutcome> + 'static,
    {
        // Resend runs alongside the form and must not lock it
        if step != AuthStep::Resend {
            self.ui_state.form_pending = true;
        }
        let auth = self.auth.clone();
        let done = self.auth_done.clone();
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = run(auth).await;
            done.borrow_mut().push((step, outcome));
            ctx.request_repaint();
        });
    }

    fn apply_auth_results(&mut self) {
        let finished = std::mem::take(&mut *self.auth_done.borrow_mut());
        for (step, outcome) in finished {
            if step != AuthStep::Resend {
                self.ui_state.form_pending = false;
            }
            if outcome != FlowOutcome::Success {
                continue;
            }
            match step {
                AuthStep::Login => self.ui_state.go_to(Screen::Mfa),
                AuthStep::Register => self.ui_state.go_to(Screen::Login),
                AuthStep::Verify => self.enter_chat(),
                AuthStep::ResetPassword => {
                    self.ui_state.recovery.token.clear();
                    self.ui_state.go_to(Screen::Login);
                }
                AuthStep::Resend | AuthStep::ForgotPassword => {}
            }
        }
    }

    fn dispatch_message(&self, text: String, ctx: &egui::Context) {
        let controller = self.controller.clone();
        let ctx = ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let outcome = controller.submit_message(&text).await;
            log::debug!("Submission finished: {:?}", outcome);
            ctx.request_repaint();
        });
    }

    fn handle_chat_action(&mut self, action: ChatAction, ctx: &egui::Context) {
        match action {
            ChatAction::None => {}
            ChatAction::Send(text) => self.dispatch_message(text, ctx),
            ChatAction::NewChat => {
                self.controller.start_new_conversation();
            }
            ChatAction::RemoveLabel(id) => {
                self.controller.remove_history_entry(id);
            }
            ChatAction::SignOut => self.sign_out(),
        }
    }

    fn handle_login_action(&mut self, action: LoginAction, ctx: &egui::Context) {
        match action {
            LoginAction::None => {}
            LoginAction::Login { email, password } => {
                self.spawn_auth(AuthStep::Login, ctx, move |auth| async move {
                    auth.login(&email, &password).await
                });
            }
            LoginAction::Register { name, email, password } => {
                self.spawn_auth(AuthStep::Register, ctx, move |auth| async move {
                    auth.register(&name, &email, &password).await
                });
            }
            LoginAction::SwitchForm => {
                self.auth.clear_feedback();
                let next = if self.ui_state.screen == Screen::Register {
                    Screen::Login
                } else {
                    Screen::Register
                };
                self.ui_state.go_to(next);
            }
            LoginAction::ForgotPassword => {
                self.auth.clear_feedback();
                self.ui_state.go_to(Screen::ForgotPassword);
            }
        }
    }

    fn handle_recovery_action(&mut self, action: RecoveryAction, ctx: &egui::Context) {
        match action {
            RecoveryAction::None => {}
            RecoveryAction::SendLink(email) => {
                self.spawn_auth(AuthStep::ForgotPassword, ctx, move |auth| async move {
                    auth.forgot_password(&email).await
                });
            }
            RecoveryAction::Reset { token, new_password } => {
                self.spawn_auth(AuthStep::ResetPassword, ctx, move |auth| async move {
                    auth.reset_password(&token, &new_password).await
                });
            }
            RecoveryAction::HaveToken => {
                self.auth.clear_feedback();
                self.ui_state.go_to(Screen::ResetPassword);
            }
            RecoveryAction::BackToLogin => {
                self.auth.clear_feedback();
                self.ui_state.go_to(Screen::Login);
            }
        }
    }

    fn handle_mfa_action(&mut self, action: MfaAction, ctx: &egui::Context) {
        match action {
            MfaAction::None => {}
            MfaAction::Verify(otp) => {
                self.spawn_auth(AuthStep::Verify, ctx, move |auth| async move {
                    auth.verify_otp(&otp).await
                });
            }
            MfaAction::Resend => {
                self.spawn_auth(AuthStep::Resend, ctx, |auth| async move {
                    auth.resend_otp().await
                });
            }
            MfaAction::BackToLogin => {
                self.auth.clear_feedback();
                self.ui_state.go_to(Screen::Login);
            }
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            theme::apply_theme(ctx);
            self.first_frame = false;
        }

        // Drain events from the chat controller
        let active = self.controller.session_id();
        let events = self.event_bus.drain_for(active.as_str());
        if !events.is_empty() {
            self.ui_state.process_events(events);
            ctx.request_repaint();
        }
        self.apply_auth_results();

        if self.ui_state.is_busy() || self.ui_state.form_pending {
            ctx.request_repaint();
        }

        match self.ui_state.screen {
            Screen::Login | Screen::Register => {
                let feedback = self.auth.feedback();
                let action = CentralPanel::default()
                    .show(ctx, |ui| login::login_panel(ui, &mut self.ui_state, &feedback))
                    .inner;
                self.handle_login_action(action, ctx);
            }
            Screen::ForgotPassword | Screen::ResetPassword => {
                let feedback = self.auth.feedback();
                let ui_state = &mut self.ui_state;
                let action = CentralPanel::default()
                    .show(ctx, |ui| {
                        if ui_state.screen == Screen::ForgotPassword {
                            recovery::forgot_password_panel(ui, ui_state, &feedback)
                        } else {
                            recovery::reset_password_panel(ui, ui_state, &feedback)
                        }
                    })
                    .inner;
                self.handle_recovery_action(action, ctx);
            }
            Screen::Mfa => {
                let feedback = self.auth.feedback();
                let cooldown = self.auth.cooldown();
                let email = self.auth.email();
                if cooldown.active {
                    // Keep the countdown caption moving
                    ctx.request_repaint_after(Duration::from_millis(250));
                }
                let action = CentralPanel::default()
                    .show(ctx, |ui| {
                        mfa::mfa_panel(ui, &mut self.ui_state, &email, &feedback, cooldown)
                    })
                    .inner;
                self.handle_mfa_action(action, ctx);
            }
            Screen::Chat => {
                let labels = self.controller.derive_titles();
                let user = self.auth.email();
                let sidebar_action = SidePanel::left("history_sidebar")
                    .resizable(false)
                    .exact_width(240.0)
                    .show(ctx, |ui| chat::history_sidebar(ui, &labels, &user))
                    .inner;

                let controller = self.controller.clone();
                let ui_state = &mut self.ui_state;
                let panel_action = CentralPanel::default()
                    .show(ctx, |ui| {
                        controller.with_transcript(|messages| chat::chat_panel(ui, ui_state, messages))
                    })
                    .inner;

                self.handle_chat_action(sidebar_action, ctx);
                self.handle_chat_action(panel_action, ctx);
            }
        }
    }
}

/// Client configuration saved under the `chat:config` slot, or defaults.
fn load_config(store: &dyn SessionStore) -> ClientConfig {
    let key = StorageKeys::default().config;
    match store.get(&key) {
        Ok(Some(raw)) => match serde_json::from_str::<ClientConfig>(&raw) {
            Ok(config) => {
                log::info!("Config restored from storage");
                config
            }
            Err(e) => {
                log::warn!("Ignoring unreadable stored config: {}", e);
                ClientConfig::default()
            }
        },
        Ok(None) => ClientConfig::default(),
        Err(e) => {
            log::warn!("Could not read stored config: {}", e);
            ClientConfig::default()
        }
    }
}

/// Path of the page the app was loaded from.
fn page_path() -> Option<String> {
    web_sys::window().and_then(|w| w.location().pathname().ok())
}
