//! Application configuration structures.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment tag partitioning registrations (dev, prod, test, ...)
    #[serde(default = "defaults::env")]
    pub env: String,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Messaging gateway settings
    #[serde(default)]
    pub groupme: GroupMeConfig,

    /// Broadcast fan-out settings
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Durable chat registry settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Shared-password settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Data file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.env.trim().is_empty() {
            return Err(AppError::validation("env is empty"));
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(AppError::validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        if self.groupme.timeout_secs == 0 {
            return Err(AppError::validation("groupme.timeout_secs must be > 0"));
        }
        if self.groupme.user_agent.trim().is_empty() {
            return Err(AppError::validation("groupme.user_agent is empty"));
        }
        if self.broadcast.max_concurrent == 0 {
            return Err(AppError::validation("broadcast.max_concurrent must be > 0"));
        }
        Ok(())
    }

    /// Names of required settings that are not set.
    ///
    /// Missing values degrade the service (no delivery, volatile registry)
    /// rather than stopping it.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.groupme.access_token.trim().is_empty() {
            missing.push("GROUPME_ACCESS_TOKEN");
        }
        if self.database.dir.is_none() {
            missing.push("DATABASE_DIR");
        }
        missing
    }

    /// Database name for the active environment.
    ///
    /// `dev`/`development` prefer `name_dev`, `prod`/`production` prefer
    /// `name_prod`; otherwise `name`, then `rhac_db`.
    pub fn database_name(&self) -> String {
        let db = &self.database;
        let chosen = match self.env.to_lowercase().as_str() {
            "dev" | "development" => db.name_dev.as_ref(),
            "prod" | "production" => db.name_prod.as_ref(),
            _ => None,
        };
        chosen
            .or(db.name.as_ref())
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(defaults::database_name)
    }

    /// Durable registry file, or `None` when no database directory is set.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database
            .dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.sqlite3", self.database_name())))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: defaults::env(),
            server: ServerConfig::default(),
            groupme: GroupMeConfig::default(),
            broadcast: BroadcastConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "defaults::bind")]
    pub bind: String,

    /// Largest accepted request body (image uploads)
    #[serde(default = "defaults::max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
            max_upload_bytes: defaults::max_upload_bytes(),
        }
    }
}

/// GroupMe API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMeConfig {
    /// Base URL of the v3 API
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    /// Image service upload endpoint
    #[serde(default = "defaults::image_url")]
    pub image_url: String,

    /// Bot account access token
    #[serde(default)]
    pub access_token: String,

    /// Timeout for each outbound call in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for outbound requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for GroupMeConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            image_url: defaults::image_url(),
            access_token: String::new(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
        }
    }
}

/// Broadcast fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Maximum deliveries in flight at once (1 = sequential)
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Durable chat registry settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// Directory holding the registry database; unset means in-memory only
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Database name used when no per-environment name applies
    #[serde(default)]
    pub name: Option<String>,

    /// Database name for dev/development
    #[serde(default)]
    pub name_dev: Option<String>,

    /// Database name for prod/production
    #[serde(default)]
    pub name_prod: Option<String>,
}

/// Shared admin password settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub admin_password: String,
}

/// Data file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::buildings_file")]
    pub buildings_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            buildings_file: defaults::buildings_file(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    pub fn env() -> String {
        "dev".into()
    }

    // Server defaults
    pub fn bind() -> String {
        "127.0.0.1:5000".into()
    }
    pub fn max_upload_bytes() -> usize {
        10 * 1024 * 1024
    }

    // GroupMe defaults
    pub fn api_url() -> String {
        "https://api.groupme.com/v3".into()
    }
    pub fn image_url() -> String {
        "https://image.groupme.com/pictures".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; RHACbot/1.0)".into()
    }

    // Broadcast defaults
    pub fn max_concurrent() -> usize {
        4
    }

    pub fn database_name() -> String {
        "rhac_db".into()
    }

    pub fn buildings_file() -> String {
        "data/buildings.json".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
