// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `AUTHCHAT_` environment variables (`AUTHCHAT_AUTH__COOKIE_NAME=...`).
use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "AUTHCHAT_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub chat: ChatSettings,
    pub log: LogSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Attach a permissive CORS layer
    pub cors_allow_any: bool,
}

/// Account, session and password settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Lifetime of a non-persistent session in seconds
    pub session_ttl_secs: u64,
    /// Lifetime of a "remember me" session in seconds
    pub persistent_session_ttl_secs: u64,
    /// Count failed logins towards an account lockout
    pub lockout_on_failure: bool,
    pub lockout: LockoutSettings,
    pub password_requirements: PasswordRequirements,
    pub hashing: HashingSettings,
    /// Accounts registered with one of these emails get the `Admin` role
    pub admin_emails: Vec<String>,
}

/// Password complexity requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
    /// Require uppercase letters
    pub require_uppercase: bool,
    /// Require lowercase letters
    pub require_lowercase: bool,
    /// Require digits
    pub require_digit: bool,
    /// Require special characters
    pub require_special: bool,
}

/// Failed-login lockout policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutSettings {
    /// Failed attempts before the account is locked
    pub max_attempts: u32,
    /// Lockout duration in seconds
    pub lockout_secs: u64,
}

/// scrypt cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

/// Chat hub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Reject hub connections without a signed-in session
    pub require_authentication: bool,
    /// Outbound frame buffer per connection
    pub client_buffer: usize,
}

/// Logging settings, consumed by the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_allow_any: false,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            cookie_name: ".AuthChat.Session".to_string(),
            session_ttl_secs: 60 * 60 * 8,                       // 8 hours
            persistent_session_ttl_secs: 60 * 60 * 24 * 14,      // 14 days
            lockout_on_failure: false,
            lockout: LockoutSettings::default(),
            password_requirements: PasswordRequirements::default(),
            hashing: HashingSettings::default(),
            admin_emails: Vec::new(),
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 5 * 60,
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            require_authentication: true,
            client_buffer: 32,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from defaults, `config.toml` in the working directory, and the environment
    pub fn load() -> Result<Self, AppError> {
        Self::figment(Path::new("config.toml")).extract().map_err(AppError::from)
    }

    /// Load settings using an explicit TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Self::figment(path).extract().map_err(AppError::from)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "invalid log level: {}",
                self.log.level
            )));
        }

        let auth = &self.auth;
        if auth.cookie_name.is_empty()
            || auth
                .cookie_name
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '='))
        {
            return Err(AppError::Config(format!(
                "invalid cookie name: {:?}",
                auth.cookie_name
            )));
        }
        if auth.session_ttl_secs == 0 || auth.persistent_session_ttl_secs == 0 {
            return Err(AppError::Config("session TTL must be positive".to_string()));
        }
        if auth.password_requirements.min_length == 0 {
            return Err(AppError::Config(
                "password min_length must be at least 1".to_string(),
            ));
        }
        if auth.lockout.max_attempts == 0 {
            return Err(AppError::Config(
                "lockout max_attempts must be at least 1".to_string(),
            ));
        }
        crate::auth::password::scrypt_params(&auth.hashing)?;

        if self.chat.client_buffer == 0 {
            return Err(AppError::Config(
                "chat client_buffer must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
