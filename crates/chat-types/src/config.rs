use serde::{Deserialize, Serialize};

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, without trailing slash
    pub api_base: String,
    /// Identity sent with every chat query. The app replaces the default
    /// with the signed-in user's email once MFA succeeds.
    pub user_id: String,
    pub resend_cooldown_secs: u32,
    /// Sidebar labels longer than this are truncated
    pub title_max_chars: usize,
    pub storage_keys: StorageKeys,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            user_id: ANONYMOUS_USER.to_string(),
            resend_cooldown_secs: 30,
            title_max_chars: 20,
            storage_keys: StorageKeys::default(),
        }
    }
}

impl ClientConfig {
    /// Join an API path onto `api_base`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Names of the browser storage slots the client uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Session-scoped: active conversation identifier
    pub session_id: String,
    /// Session-scoped: email carried from login to the MFA step
    pub email: String,
    /// Persistent: auth token, cleared on logout
    pub auth_token: String,
    /// Persistent: serialized `ClientConfig`
    pub config: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            session_id: "chatSessionId".to_string(),
            email: "email".to_string(),
            auth_token: "token".to_string(),
            config: "chat:config".to_string(),
        }
    }
}

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const ANONYMOUS_USER: &str = "anonymous";
