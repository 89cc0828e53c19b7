mod settings;

pub use settings::{
    LoggingConfig, MemoryConfig, Settings, StoreConfig, DEFAULT_MESSAGES_PATH, DEFAULT_USER_AGENT,
};
