pub mod chat;
pub mod login;
pub mod mfa;
pub mod recovery;
