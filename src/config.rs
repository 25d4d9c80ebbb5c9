use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://vocab.db?mode=rwc";
pub const DEFAULT_DAILY_NEW_ITEMS: i64 = 5;
pub const DEFAULT_LOG_DIR: &str = "./logs";
pub const DEFAULT_LOG_FILE_NAME: &str = "vocab-srs.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub log: LogConfig,
    pub database: DbConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log: LogConfig::from_env()?,
            database: DbConfig::from_env(),
            scheduler: SchedulerConfig::from_env()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `vocab_srs=debug`.
    pub level: String,
    /// Daily-rolling file output in addition to stderr; off when `None`.
    pub file: Option<FileLogConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    pub file_name: String,
}

impl LogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let level = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());

        let file = if parse_flag("ENABLE_FILE_LOGS", std::env::var("ENABLE_FILE_LOGS").ok())? {
            Some(FileLogConfig {
                dir: std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_DIR)),
                file_name: std::env::var("LOG_FILE_NAME")
                    .unwrap_or_else(|_| DEFAULT_LOG_FILE_NAME.to_string()),
            })
        } else {
            None
        };

        Ok(Self { level, file })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl DbConfig {
    fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let max_connections = env_u32("DB_MAX_CONNECTIONS", 5).max(1);
        let busy_timeout_ms = env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000);

        Self {
            url,
            max_connections,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Applied on registration and to users without a stored record.
    pub default_daily_new_items: i64,
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let default_daily_new_items = match std::env::var("DEFAULT_DAILY_NEW_ITEMS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(value) if value >= 0 => value,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DEFAULT_DAILY_NEW_ITEMS",
                        value: raw,
                    })
                }
            },
            Err(_) => DEFAULT_DAILY_NEW_ITEMS,
        };

        Ok(Self {
            default_daily_new_items,
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_daily_new_items: DEFAULT_DAILY_NEW_ITEMS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

fn parse_flag(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}
