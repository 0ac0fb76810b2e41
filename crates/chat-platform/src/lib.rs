//! Browser adapters for the chat-core ports.

pub mod storage;
pub mod http;
pub mod timer;
