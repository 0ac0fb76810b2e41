//! One-time passcode screen with a throttled resend button.

use egui::{self, RichText, Vec2};
use chat_core::auth::FormFeedback;
use chat_core::cooldown::CooldownState;
use crate::panels::login::feedback_lines;
use crate::state::UiState;
use crate::theme::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MfaAction {
    None,
    Verify(String),
    Resend,
    BackToLogin,
}

/// Caption of the resend button for the given cooldown.
pub fn resend_label(cooldown: CooldownState) -> String {
    if cooldown.active {
        format!("Resend OTP in {}s", cooldown.remaining)
    } else {
        "Resend OTP".to_string()
    }
}

pub fn mfa_panel(
    ui: &mut egui::Ui,
    state: &mut UiState,
    email: &str,
    feedback: &FormFeedback,
    cooldown: CooldownState,
) -> MfaAction {
    let mut action = MfaAction::None;

    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() * 0.15);
        egui::Frame::default()
            .fill(BG_SECONDARY)
            .inner_margin(Vec2::new(24.0, 20.0))
            .corner_radius(PANEL_ROUNDING)
            .show(ui, |ui| {
                ui.set_width(FORM_WIDTH);
                ui.heading(
                    RichText::new("Multi-Factor Authentication")
                        .color(ACCENT)
                        .strong(),
                );
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!(
                        "An OTP has been sent to {}. Please check your email.",
                        email
                    ))
                    .color(TEXT_SECONDARY),
                );
                ui.add_space(8.0);

                let otp = ui.add(
                    egui::TextEdit::singleline(&mut state.otp_input)
                        .hint_text("Enter OTP")
                        .horizontal_align(egui::Align::Center)
                        .font(egui::FontId::monospace(18.0))
                        .desired_width(f32::INFINITY),
                );

                feedback_lines(ui, feedback);
                ui.add_space(8.0);

                let verify = ui.add_enabled(
                    !state.form_pending,
                    egui::Button::new(RichText::new("Verify OTP").color(TEXT_PRIMARY).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(ui.available_width(), 32.0)),
                );
                let entered = otp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if verify.clicked() || (entered && !state.form_pending) {
                    // Empty input is reported by the flow itself
                    action = MfaAction::Verify(state.otp_input.trim().to_string());
                }

                ui.add_space(8.0);
                let resend = ui.add_enabled(
                    !cooldown.active,
                    egui::Button::new(RichText::new(resend_label(cooldown)).color(TEXT_PRIMARY))
                        .fill(BG_SURFACE)
                        .corner_radius(PANEL_ROUNDING),
                );
                if resend.clicked() {
                    action = MfaAction::Resend;
                }

                ui.add_space(4.0);
                if ui.link(RichText::new("Back to login").color(TEXT_SECONDARY)).clicked() {
                    action = MfaAction::BackToLogin;
                }
            });
    });

    action
}
