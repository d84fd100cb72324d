use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Database URL; when absent the server falls back to the in-memory store
    pub db_url: Option<String>,

    /// Hard ceiling on the shared document length, in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Maximum chat message body length, in characters
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Hours without activity before an auto-delete room is reclaimed
    #[serde(default = "default_inactivity_threshold_hours")]
    pub inactivity_threshold_hours: u64,

    /// Seconds between cleanup sweep passes
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Join requests allowed per session per rate-limit window
    #[serde(default = "default_join_rate_limit")]
    pub join_rate_limit: u32,

    /// Chat messages allowed per session per rate-limit window
    #[serde(default = "default_chat_rate_limit")]
    pub chat_rate_limit: u32,

    /// Rate-limit window length in seconds
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Check if running in production mode
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "prod" || self.environment.to_lowercase() == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            db_url: None,
            max_text_length: default_max_text_length(),
            max_message_length: default_max_message_length(),
            inactivity_threshold_hours: default_inactivity_threshold_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            join_rate_limit: default_join_rate_limit(),
            chat_rate_limit: default_chat_rate_limit(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_text_length() -> usize {
    50_000
}

fn default_max_message_length() -> usize {
    1_000
}

fn default_inactivity_threshold_hours() -> u64 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_join_rate_limit() -> u32 {
    10
}

fn default_chat_rate_limit() -> u32 {
    30
}

fn default_rate_limit_window_secs() -> u64 {
    60
}
