//! Core data type definitions

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role value that grants administrator access
pub const ADMIN_ROLE: &str = "admin";

/// Durable store key holding the raw access token
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Durable store key holding the JSON-encoded user
pub const AUTH_USER_KEY: &str = "auth_user";

/// Account record as returned by the gateway
///
/// Only `id` and `role` are interpreted locally. Every other field is kept in
/// `profile` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub role: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    pub fn new(id: i64, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            profile: Map::new(),
        }
    }

    /// Attach a profile field
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.profile.insert(key.to_string(), value.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Read a string profile field
    pub fn profile_str(&self, key: &str) -> Option<&str> {
        self.profile.get(key).and_then(Value::as_str)
    }

    /// Best human-readable label for the account
    pub fn display_string(&self) -> String {
        let name = self
            .profile_str("username")
            .filter(|s| !s.is_empty())
            .or_else(|| self.profile_str("email"));
        match name {
            Some(name) => format!("{} ({})", name, self.role),
            None => format!("#{} ({})", self.id, self.role),
        }
    }
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Successful login / registration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// Point-in-time copy of the session fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: crate::logging::LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Gateway API root, e.g. `https://relay.example.com/api/v1`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds between background identity refreshes
    pub refresh_interval_secs: u64,
    /// Upper bound on the logout notification round trip
    pub logout_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            logout_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted session; `~` expands to the home directory
    pub data_dir: String,
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> std::path::PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| std::path::PathBuf::from(&self.data_dir)),
            None => std::path::PathBuf::from(&self.data_dir),
        }
    }
}
