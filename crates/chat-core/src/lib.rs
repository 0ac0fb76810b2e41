pub mod ports;
pub mod event_bus;
pub mod session;
pub mod transcript;
pub mod chat;
pub mod cooldown;
pub mod auth;

#[cfg(test)]
mod tests;
