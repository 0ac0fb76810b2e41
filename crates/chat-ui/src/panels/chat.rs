//! Chat screen: history sidebar, transcript and input field.

use egui::{self, Align, Layout, RichText, ScrollArea, Vec2};
use chat_types::message::{HistoryLabel, Message, Sender};
use crate::state::UiState;
use crate::theme::*;

/// What the caller should do after rendering the chat screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatAction {
    None,
    Send(String),
    NewChat,
    RemoveLabel(u64),
    SignOut,
}

/// Render the sidebar: "New Chat", one row per label, and sign-out.
pub fn history_sidebar(ui: &mut egui::Ui, labels: &[HistoryLabel], user: &str) -> ChatAction {
    let mut action = ChatAction::None;

    egui::Frame::default()
        .fill(BG_SIDEBAR)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                let new_chat = ui.add(
                    egui::Button::new(RichText::new("+ New Chat").color(TEXT_PRIMARY).strong())
                        .fill(ACCENT)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(ui.available_width(), 32.0)),
                );
                if new_chat.clicked() {
                    action = ChatAction::NewChat;
                }

                ui.add_space(12.0);

                let list_height = ui.available_height() - 80.0;
                ScrollArea::vertical()
                    .max_height(list_height)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        if labels.is_empty() {
                            ui.label(
                                RichText::new("No messages yet")
                                    .color(TEXT_SECONDARY)
                                    .small()
                                    .italics(),
                            );
                        }
                        for label in labels {
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new(format!("💬 {}", label.text)).color(TEXT_PRIMARY),
                                );
                                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                                    if ui
                                        .small_button(RichText::new("🗑").color(TEXT_SECONDARY))
                                        .on_hover_text("Remove from list")
                                        .clicked()
                                    {
                                        action = ChatAction::RemoveLabel(label.id);
                                    }
                                });
                            });
                        }
                    });

                ui.separator();
                if !user.is_empty() {
                    ui.label(RichText::new(user).color(TEXT_SECONDARY).small());
                }
                let sign_out = ui.add(
                    egui::Button::new(RichText::new("Sign Out").color(TEXT_PRIMARY))
                        .fill(BG_SURFACE)
                        .corner_radius(PANEL_ROUNDING)
                        .min_size(Vec2::new(ui.available_width(), 28.0)),
                );
                if sign_out.clicked() {
                    action = ChatAction::SignOut;
                }
            });
        });

    action
}

/// Render the transcript and input. Returns `Send` when the user submits.
pub fn chat_panel(ui: &mut egui::Ui, state: &mut UiState, messages: &[Message]) -> ChatAction {
    let mut action = ChatAction::None;

    egui::Frame::default()
        .fill(BG_PRIMARY)
        .inner_margin(PANEL_PADDING)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                // Header
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("My Chatbot").color(TEXT_PRIMARY).strong());
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let status_color = if state.is_busy() { WARNING } else { SUCCESS };
                        ui.label(RichText::new(&state.status_text).color(status_color).small());
                        if !state.session_label.is_empty() {
                            ui.label(
                                RichText::new(format!("session {}", state.session_label))
                                    .color(TEXT_SECONDARY)
                                    .small()
                                    .monospace(),
                            );
                        }
                    });
                });

                ui.separator();

                // Messages area
                let available_height = ui.available_height() - 60.0;
                ScrollArea::vertical()
                    .max_height(available_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for msg in messages {
                            render_message(ui, msg);
                            ui.add_space(4.0);
                        }
                        if state.is_busy() {
                            ui.vertical_centered(|ui| {
                                ui.label(RichText::new("Thinking...").color(TEXT_SECONDARY).italics());
                            });
                        }
                    });

                ui.add_space(8.0);

                // Input area
                ui.horizontal(|ui| {
                    let busy = state.is_busy();
                    let input = egui::TextEdit::singleline(&mut state.input_text)
                        .hint_text("Type a message...")
                        .desired_width(ui.available_width() - 70.0)
                        .font(egui::FontId::proportional(14.0));

                    let response = ui.add_enabled(!busy, input);

                    let send_enabled = !state.input_text.trim().is_empty() && !busy;
                    let send_btn = ui.add_enabled(
                        send_enabled,
                        egui::Button::new(RichText::new("Send").color(TEXT_PRIMARY))
                            .fill(if send_enabled { ACCENT } else { BG_SURFACE })
                            .corner_radius(PANEL_ROUNDING)
                            .min_size(Vec2::new(60.0, 0.0)),
                    );

                    // Submit on Enter or button click
                    let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if (entered && send_enabled) || send_btn.clicked() {
                        action = ChatAction::Send(state.input_text.trim().to_string());
                        state.input_text.clear();
                        response.request_focus();
                    }
                });
            });
        });

    action
}

fn render_message(ui: &mut egui::Ui, msg: &Message) {
    let (layout, fill, text_color) = match msg.sender {
        Sender::User => (Layout::right_to_left(Align::TOP), USER_BUBBLE, TEXT_PRIMARY),
        Sender::Assistant => (Layout::left_to_right(Align::TOP), ASSISTANT_BUBBLE, ASSISTANT_TEXT),
    };
    let max_width = ui.available_width() * 0.7;

    ui.with_layout(layout, |ui| {
        egui::Frame::default()
            .fill(fill)
            .corner_radius(BUBBLE_ROUNDING)
            .inner_margin(Vec2::new(12.0, 8.0))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                ui.label(RichText::new(&msg.text).color(text_color));
            });
    });
}
