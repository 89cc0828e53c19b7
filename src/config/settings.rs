use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_MESSAGES_PATH: &str = "/messages";
pub const DEFAULT_USER_AGENT: &str = concat!("remote-memory/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub memory: MemoryConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub messages_path: String,
    pub user_agent: String,
    pub request_timeout_ms: u64,
    /// Deadline applied to a whole operation when the caller sets none.
    #[serde(default)]
    pub operation_timeout_ms: Option<u64>,
}

impl MemoryConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub root: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            memory: MemoryConfig {
                messages_path: DEFAULT_MESSAGES_PATH.to_string(),
                user_agent: DEFAULT_USER_AGENT.to_string(),
                request_timeout_ms: 30_000,
                operation_timeout_ms: None,
            },
            store: StoreConfig {
                root: "./memory-store".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Defaults, then `config/{CONFIG_ENV}`, then `APP__*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::with_defaults()?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("memory.messages_path", defaults.memory.messages_path)?
            .set_default("memory.user_agent", defaults.memory.user_agent)?
            .set_default("memory.request_timeout_ms", defaults.memory.request_timeout_ms)?
            .set_default("store.root", defaults.store.root)?
            .set_default("logging.level", defaults.logging.level)
    }
}
