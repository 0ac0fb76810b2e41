//! egui screens for the chat client.

pub mod state;
pub mod theme;
pub mod panels;
