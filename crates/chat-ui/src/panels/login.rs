//! Login and registration forms.

use egui::{self, RichText, Vec2};
use chat_core::auth::FormFeedback;
use crate::state::{Screen, UiState};
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    None,
    Login { email: String, password: String },
    Register { name: String, email: String, password: String },
    /// Flip between the login and registration forms
    SwitchForm,
    ForgotPassword,
}

/// Render whichever credentials form `state.screen` selects.
pub fn login_panel(ui: &mut egui::Ui, state: &mut UiState, feedback: &FormFeedback) -> LoginAction {
    let mut action = LoginAction::None;
    let registering = state.screen == Screen::Register;

    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.15);
        egui::Frame::default()
            .fill(BG_SECONDARY)
            .inner_margin(Vec2::new(24.0, 20.0))
            .corner_radius(PANEL_ROUNDING)
            .show(ui, |ui| {
                ui.set_width(FORM_WIDTH);
                let title = if registering { "Create Account" } else { "Login" };
                ui.heading(RichText::new(title).color(TEXT_PRIMARY).strong());
                ui.add_space(8.0);

                feedback_lines(ui, feedback);

                let form = &mut state.credentials;
                if registering {
                    ui.add(
                        egui::TextEdit::singleline(&mut form.name)
                            .hint_text("Name")
                            .desired_width(f32::INFINITY),
                    );
                }
                ui.add(
                    egui::TextEdit::singleline(&mut form.email)
                        .hint_text("Email")
                        .desired_width(f32::INFINITY),
                );
                let password = ui.add(
                    egui::TextEdit::singleline(&mut form.password)
                        .password(true)
                        .hint_text("Password")
                        .desired_width(f32::INFINITY),
                );

                ui.add_space(8.0);

                let ready = !state.form_pending
                    && if registering { form.can_register() } else { form.can_login() };
                let label = if registering { "Register" } else { "Login" };
                let submit = ui.add_enabled(
                    ready,
                    egui::Button::new(RichText::new(label).color(TEXT_PRIMARY).strong())
                        .fill(if ready { ACCENT } else { BG_SURFACE })
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(ui.available_width(), 32.0)),
                );
                let entered = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                if submit.clicked() || (entered && ready) {
                    action = if registering {
                        LoginAction::Register {
                            name: form.name.trim().to_string(),
                            email: form.email.trim().to_string(),
                            password: form.password.clone(),
                        }
                    } else {
                        LoginAction::Login {
                            email: form.email.trim().to_string(),
                            password: form.password.clone(),
                        }
                    };
                }

                ui.add_space(4.0);
                let switch = if registering { "Back to login" } else { "Register" };
                if ui.link(RichText::new(switch).color(TEXT_SECONDARY)).clicked() {
                    action = LoginAction::SwitchForm;
                }
                if !registering
                    && ui
                        .link(RichText::new("Forgot password?").color(TEXT_SECONDARY))
                        .clicked()
                {
                    action = LoginAction::ForgotPassword;
                }
            });
    });

    action
}

/// Error and success lines shown above a form
pub fn feedback_lines(ui: &mut egui::Ui, feedback: &FormFeedback) {
    if let Some(err) = &feedback.error {
        ui.label(RichText::new(err).color(ERROR));
    }
    if let Some(ok) = &feedback.success {
        ui.label(RichText::new(ok).color(SUCCESS));
    }
}
