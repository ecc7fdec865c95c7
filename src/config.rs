//! Configuration module for loading and parsing TOML configuration files.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound accepted for `chat.max_page_size`.
pub const MAX_PAGE_SIZE_CEILING: u32 = 100;

/// Configuration file read when `CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Credential verification.
    pub auth: AuthConfig,
    /// Persistence.
    pub database: DatabaseConfig,
    /// Chat limits.
    pub chat: ChatConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
    /// Interval between WebSocket keep-alive pings.
    pub ws_ping_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            ws_ping_interval_secs: 25,
        }
    }
}

/// Access token settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// Lifetime of issued access tokens.
    pub access_token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_ttl_secs: 15 * 60,
        }
    }
}

/// Database settings. Without a URL the server runs on the in-memory store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string.
    pub url: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    pub acquire_timeout_secs: u64,
    /// Run embedded migrations on startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
            run_migrations: true,
        }
    }
}

/// Chat limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Page size when the client omits `limit`.
    pub default_page_size: u32,
    /// Largest accepted `limit`.
    pub max_page_size: u32,
    /// Largest accepted message body, in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: MAX_PAGE_SIZE_CEILING,
            max_message_length: 5000,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file named by `CONFIG_PATH`, or `config.toml` when it
    /// exists, falling back to defaults, then applies environment overrides.
    ///
    /// # Errors
    /// Returns error if the file cannot be loaded or an override is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            Err(_) => Self::default(),
        };
        base.with_env_overrides()
    }

    /// Applies `HOST`, `PORT`, `DATABASE_URL` and `JWT_SECRET` overrides
    /// from the process environment, then re-validates.
    ///
    /// # Errors
    /// Returns error if an override is malformed or the result is invalid.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns error if an override is malformed or the result is invalid.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT is not a port: {port}")))?;
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validates the configuration values.
    ///
    /// An empty `jwt_secret` is accepted here and rejected at startup, so a
    /// file can leave it to the environment.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.ws_ping_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "server.ws_ping_interval_secs must be positive".to_string(),
            ));
        }
        if self.auth.access_token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.access_token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be positive".to_string(),
            ));
        }

        let chat = &self.chat;
        if chat.max_page_size == 0 || chat.max_page_size > MAX_PAGE_SIZE_CEILING {
            return Err(ConfigError::InvalidValue(format!(
                "chat.max_page_size must be between 1 and {MAX_PAGE_SIZE_CEILING}"
            )));
        }
        if chat.default_page_size == 0 || chat.default_page_size > chat.max_page_size {
            return Err(ConfigError::InvalidValue(
                "chat.default_page_size must be between 1 and chat.max_page_size".to_string(),
            ));
        }
        if chat.max_message_length == 0 {
            return Err(ConfigError::InvalidValue(
                "chat.max_message_length must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
