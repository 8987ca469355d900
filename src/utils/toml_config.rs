//! TOML-based configuration for jobgate
//!
//! Infrastructure settings live in `jobgate.toml`; secrets are referenced by
//! environment variable name and resolved at startup (a `.env` file is
//! honoured via `dotenvy`).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! profile = "production"
//!
//! [auth]
//! jwt_secret_env = "JWT_SECRET"
//! refresh_token_days = 7
//!
//! [access]
//! unmatched_routes = "deny"
//! allowed_origins = ["https://jobs.example.com"]
//!
//! [rate_limit]
//! post_per_minute = 20
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure loaded from jobgate.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

// ============= Server Configuration =============

/// Deployment profile. Only `development` may disable authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json_logs: bool,

    #[serde(default)]
    pub profile: Profile,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            json_logs: false,
            profile: Profile::default(),
        }
    }
}

// ============= Authentication Configuration =============

/// Longest refresh token lifetime the config accepts.
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// When false, debug identity headers are trusted and authorization is
    /// skipped. Rejected in the production profile.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Environment variable name containing the JWT signing secret
    #[serde(default = "default_jwt_secret_env")]
    pub jwt_secret_env: String,

    /// Refresh token lifetime in days
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,

    /// Mark session cookies `Secure` (requires HTTPS)
    #[serde(default)]
    pub secure_cookies: bool,

    /// How often the revocation reaper sweeps expired entries
    #[serde(default = "default_revocation_sweep_secs")]
    pub revocation_sweep_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_jwt_secret_env() -> String {
    "JWT_SECRET".to_string()
}

fn default_refresh_token_days() -> i64 {
    7
}

fn default_revocation_sweep_secs() -> u64 {
    300
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jwt_secret_env: default_jwt_secret_env(),
            refresh_token_days: default_refresh_token_days(),
            secure_cookies: false,
            revocation_sweep_secs: default_revocation_sweep_secs(),
        }
    }
}

impl AuthConfig {
    pub fn revocation_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.revocation_sweep_secs)
    }
}

// ============= Access Control Configuration =============

/// What the authorization gate does with routes absent from the permission
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedRoutePolicy {
    /// Unlisted routes are unrestricted (fail-open).
    #[default]
    Allow,
    /// Unlisted routes are rejected with `insufficient_permissions`.
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub unmatched_routes: UnmatchedRoutePolicy,

    /// Upper bound for each ban/ownership/refresh persistence lookup
    #[serde(default = "default_persistence_timeout_ms")]
    pub persistence_timeout_ms: u64,

    /// Browser origins allowed to call the API. Requests carrying any other
    /// `Origin` are refused. Empty disables origin checks and CORS headers.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_persistence_timeout_ms() -> u64 {
    3000
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            unmatched_routes: UnmatchedRoutePolicy::default(),
            persistence_timeout_ms: default_persistence_timeout_ms(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AccessConfig {
    pub fn persistence_timeout(&self) -> Duration {
        Duration::from_millis(self.persistence_timeout_ms)
    }
}

// ============= Rate Limiting =============

/// Per-client request quotas, one bucket per HTTP method. Methods without a
/// quota (HEAD, OPTIONS) are not limited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_get_per_minute")]
    pub get_per_minute: u32,

    #[serde(default = "default_post_per_minute")]
    pub post_per_minute: u32,

    #[serde(default = "default_write_per_minute")]
    pub put_per_minute: u32,

    #[serde(default = "default_write_per_minute")]
    pub patch_per_minute: u32,

    #[serde(default = "default_write_per_minute")]
    pub delete_per_minute: u32,

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` before the socket
    /// address. Only enable behind a proxy that sets them.
    #[serde(default)]
    pub trust_proxy_headers: bool,
}

fn default_get_per_minute() -> u32 {
    2500
}

fn default_post_per_minute() -> u32 {
    20
}

fn default_write_per_minute() -> u32 {
    25
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            get_per_minute: default_get_per_minute(),
            post_per_minute: default_post_per_minute(),
            put_per_minute: default_write_per_minute(),
            patch_per_minute: default_write_per_minute(),
            delete_per_minute: default_write_per_minute(),
            trust_proxy_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Quota for `method`, if it has one.
    pub fn per_minute(&self, method: &axum::http::Method) -> Option<u32> {
        use axum::http::Method;

        match *method {
            Method::GET => Some(self.get_per_minute),
            Method::POST => Some(self.post_per_minute),
            Method::PUT => Some(self.put_per_minute),
            Method::PATCH => Some(self.patch_per_minute),
            Method::DELETE => Some(self.delete_per_minute),
            _ => None,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for crate::types::AppError {
    fn from(err: ConfigError) -> Self {
        crate::types::AppError::Configuration(err.to_string())
    }
}

impl GateConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Parse without validation
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth.enabled && self.server.profile == Profile::Production {
            return Err(ConfigError::ValidationError(
                "auth.enabled = false is not permitted in the production profile".to_string(),
            ));
        }

        if self.auth.enabled {
            self.validate_env_var(&self.auth.jwt_secret_env)?;
        }

        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&self.auth.refresh_token_days) {
            return Err(ConfigError::ValidationError(format!(
                "auth.refresh_token_days must be between 1 and {MAX_REFRESH_TOKEN_DAYS} (got {})",
                self.auth.refresh_token_days
            )));
        }

        if self.auth.revocation_sweep_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.revocation_sweep_secs must be greater than zero".to_string(),
            ));
        }

        if self.access.persistence_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "access.persistence_timeout_ms must be greater than zero".to_string(),
            ));
        }

        for origin in &self.access.allowed_origins {
            if origin == "*" || axum::http::HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "access.allowed_origins: '{origin}' is not an explicit origin"
                )));
            }
        }

        let limits = &self.rate_limit;
        for (name, value) in [
            ("get_per_minute", limits.get_per_minute),
            ("post_per_minute", limits.post_per_minute),
            ("put_per_minute", limits.put_per_minute),
            ("patch_per_minute", limits.patch_per_minute),
            ("delete_per_minute", limits.delete_per_minute),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "rate_limit.{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        match std::env::var(name) {
            Ok(value) if !value.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingEnvVar(name.to_string())),
        }
    }

    /// Get the JWT secret from the environment
    pub fn jwt_secret(&self) -> Result<String, ConfigError> {
        std::env::var(&self.auth.jwt_secret_env)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(self.auth.jwt_secret_env.clone()))
    }
}
