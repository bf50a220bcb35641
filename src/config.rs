//! # Configuration
//!
//! `AppConfig` is read from an optional JSON file (every field defaulted),
//! then environment variables override individual fields. A `.env` file in
//! the working directory is loaded first.
//!
//! | Variable           | Field                            |
//! |--------------------|----------------------------------|
//! | `PORT`             | `http.port`                      |
//! | `QV_HOST`          | `http.host`                      |
//! | `QV_CORS_ORIGINS`  | `http.cors_origins` (comma list) |
//! | `QV_MONGO_URI`     | `database.uri` (selects mongo)   |
//! | `QV_DATABASE`      | `database.database`              |
//! | `QV_SEARCH_INDEX`  | `database.search_index`          |
//! | `QV_COOKIE_SECURE` | `session.secure`                 |
//! | `QV_LOG_FORMAT`    | `logging.format`                 |

use std::fs;
use std::path::Path;

use axum_extra::extract::cookie::SameSite;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;
use crate::search::DEFAULT_SEARCH_INDEX;

pub const DEFAULT_CONFIG_FILE: &str = "quoteversation.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process stores; data is lost on exit
    #[default]
    Memory,
    Mongo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Connection string, required for the mongo backend
    #[serde(default)]
    pub uri: Option<String>,

    /// Database holding `posts` and `users`
    #[serde(default = "default_database")]
    pub database: String,

    /// Database holding `sessions`
    #[serde(default = "default_session_database")]
    pub session_database: String,

    #[serde(default = "default_search_index")]
    pub search_index: String,
}

fn default_database() -> String {
    "social_data".to_string()
}

fn default_session_database() -> String {
    "metadata".to_string()
}

fn default_search_index() -> String {
    DEFAULT_SEARCH_INDEX.to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            uri: None,
            database: default_database(),
            session_database: default_session_database(),
            search_index: default_search_index(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    #[default]
    Lax,
    Strict,
    None,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Session cookie settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,

    /// Only send the cookie over HTTPS
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub same_site: SameSitePolicy,
}

fn default_cookie_name() -> String {
    "qv_session".to_string()
}

fn default_ttl_hours() -> u32 {
    24
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            ttl_hours: default_ttl_hours(),
            secure: false,
            same_site: SameSitePolicy::default(),
        }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ttl_hours))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl AppConfig {
    /// Load from `path` if given (or `quoteversation.json` if it exists),
    /// then apply `.env` and process environment overrides.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var: "PORT", value: port })?;
        }
        if let Some(host) = lookup("QV_HOST") {
            self.http.host = host;
        }
        if let Some(origins) = lookup("QV_CORS_ORIGINS") {
            self.http.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(uri) = lookup("QV_MONGO_URI") {
            self.database.backend = StoreBackend::Mongo;
            self.database.uri = Some(uri);
        }
        if let Some(database) = lookup("QV_DATABASE") {
            self.database.database = database;
        }
        if let Some(index) = lookup("QV_SEARCH_INDEX") {
            self.database.search_index = index;
        }
        if let Some(secure) = lookup("QV_COOKIE_SECURE") {
            self.session.secure = parse_bool(&secure)
                .ok_or(ConfigError::InvalidEnv { var: "QV_COOKIE_SECURE", value: secure })?;
        }
        if let Some(format) = lookup("QV_LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => return Err(ConfigError::InvalidEnv { var: "QV_LOG_FORMAT", value: format }),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.backend == StoreBackend::Mongo
            && self.database.uri.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "the mongo backend requires database.uri (or QV_MONGO_URI)".to_string(),
            ));
        }
        if self.session.cookie_name.is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name must not be empty".to_string()));
        }
        if self.session.ttl_hours == 0 {
            return Err(ConfigError::Invalid("session.ttl_hours must be > 0".to_string()));
        }
        if self.session.same_site == SameSitePolicy::None && !self.session.secure {
            return Err(ConfigError::Invalid(
                "session.same_site = none requires session.secure".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
