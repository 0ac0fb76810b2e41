pub mod memory;
pub mod web;
pub mod auto;

pub use memory::MemoryStore;
pub use web::{WebStorage, WebStorageKind};
pub use auto::{persistent_store, session_store};
