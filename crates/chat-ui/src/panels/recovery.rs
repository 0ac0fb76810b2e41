//! Password recovery: request a reset link, then set a new password.

use egui::{self, RichText, Vec2};
use chat_core::auth::FormFeedback;
use crate::panels::login::feedback_lines;
use crate::state::UiState;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    SendLink(String),
    Reset { token: String, new_password: String },
    /// Open the reset form to paste a token by hand
    HaveToken,
    BackToLogin,
}

pub fn forgot_password_panel(
    ui: &mut egui::Ui,
    state: &mut UiState,
    feedback: &FormFeedback,
) -> RecoveryAction {
    let mut action = RecoveryAction::None;

    recovery_frame(ui, "Forgot Password", |ui| {
        ui.label(
            RichText::new("Enter your email and we will send you a reset link.")
                .color(TEXT_SECONDARY),
        );
        ui.add_space(8.0);
        feedback_lines(ui, feedback);

        let form = &mut state.recovery;
        let email = ui.add(
            egui::TextEdit::singleline(&mut form.email)
                .hint_text("Email")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);

        let ready = !state.form_pending && form.can_request();
        let send = submit_button(ui, "Send Reset Link", ready);
        let entered = email.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if send.clicked() || (entered && ready) {
            action = RecoveryAction::SendLink(form.email.trim().to_string());
        }

        ui.add_space(4.0);
        if ui.link(RichText::new("I have a reset token").color(TEXT_SECONDARY)).clicked() {
            action = RecoveryAction::HaveToken;
        }
        if ui.link(RichText::new("Back to login").color(TEXT_SECONDARY)).clicked() {
            action = RecoveryAction::BackToLogin;
        }
    });

    action
}

pub fn reset_password_panel(
    ui: &mut egui::Ui,
    state: &mut UiState,
    feedback: &FormFeedback,
) -> RecoveryAction {
    let mut action = RecoveryAction::None;

    recovery_frame(ui, "Reset Password", |ui| {
        feedback_lines(ui, feedback);

        let form = &mut state.recovery;
        ui.add(
            egui::TextEdit::singleline(&mut form.token)
                .hint_text("Reset token")
                .font(egui::FontId::monospace(14.0))
                .desired_width(f32::INFINITY),
        );
        let password = ui.add(
            egui::TextEdit::singleline(&mut form.new_password)
                .password(true)
                .hint_text("New password")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(8.0);

        let ready = !state.form_pending && form.can_reset();
        let reset = submit_button(ui, "Reset Password", ready);
        let entered = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if reset.clicked() || (entered && ready) {
            action = RecoveryAction::Reset {
                token: form.token.trim().to_string(),
                new_password: form.new_password.clone(),
            };
        }

        ui.add_space(4.0);
        if ui.link(RichText::new("Back to login").color(TEXT_SECONDARY)).clicked() {
            action = RecoveryAction::BackToLogin;
        }
    });

    action
}

fn recovery_frame(ui: &mut egui::Ui, title: &str, body: impl FnOnce(&mut egui::Ui)) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.15);
        egui::Frame::default()
            .fill(BG_SECONDARY)
            .inner_margin(Vec2::new(24.0, 20.0))
            .corner_radius(PANEL_ROUNDING)
            .show(ui, |ui| {
                ui.set_width(FORM_WIDTH);
                ui.heading(RichText::new(title).color(TEXT_PRIMARY).strong());
                ui.add_space(8.0);
                body(ui);
            });
    });
}

fn submit_button(ui: &mut egui::Ui, label: &str, enabled: bool) -> egui::Response {
    ui.add_enabled(
        enabled,
        egui::Button::new(RichText::new(label).color(TEXT_PRIMARY).strong())
            .fill(if enabled { ACCENT } else { BG_SURFACE })
            .corner_radius(PANEL_ROUNDING)
            .min_size(Vec2::new(ui.available_width(), 32.0)),
    )
}
