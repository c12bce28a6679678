/// Configuration management for Courier
use crate::error::{CourierError, CourierResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub instance: InstanceConfig,
    pub storage: StorageConfig,
    pub workers: WorkerConfig,
    pub statuses: StatusConfig,
    pub polls: PollConfig,
    pub scheduled: ScheduledStatusConfig,
    pub logging: LoggingConfig,
}

/// Instance identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Host used to build URIs for local accounts and statuses
    pub host: String,
    /// "https" in production, "http" for local testing
    pub protocol: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub max_connections: u32,
}

/// Worker pool sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Consumers draining client-originated messages
    pub client_workers: usize,
    /// Consumers draining federation-originated messages
    pub federator_workers: usize,
}

/// Status content limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Max chars of text + content warning combined
    pub max_chars: usize,
    pub max_media_files: usize,
    pub media_description_min_chars: usize,
    pub media_description_max_chars: usize,
    pub max_pinned: usize,
    /// Language used when neither request nor account sets one
    pub default_language: String,
}

/// Poll limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub max_options: usize,
    pub option_max_chars: usize,
}

/// Scheduled status limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledStatusConfig {
    pub max_daily: usize,
    pub max_total: usize,
    /// Minimum distance into the future, in seconds
    pub min_delay_secs: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CourierResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("COURIER_HOST")
            .map_err(|_| CourierError::Validation("COURIER_HOST required".to_string()))?;
        let protocol = env::var("COURIER_PROTOCOL").unwrap_or_else(|_| "https".to_string());

        let data_directory = env::var("COURIER_DATA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let database = env::var("COURIER_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("courier.sqlite"));

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            instance: InstanceConfig { host, protocol },
            storage: StorageConfig {
                data_directory,
                database,
                max_connections: env_or("COURIER_DB_MAX_CONNECTIONS", 10),
            },
            workers: WorkerConfig {
                client_workers: env_or("COURIER_CLIENT_WORKERS", 4),
                federator_workers: env_or("COURIER_FEDERATOR_WORKERS", 4),
            },
            statuses: StatusConfig {
                max_chars: env_or("COURIER_STATUSES_MAX_CHARS", 5000),
                max_media_files: env_or("COURIER_STATUSES_MEDIA_MAX_FILES", 6),
                media_description_min_chars: env_or("COURIER_MEDIA_DESCRIPTION_MIN_CHARS", 0),
                media_description_max_chars: env_or("COURIER_MEDIA_DESCRIPTION_MAX_CHARS", 1500),
                max_pinned: env_or("COURIER_STATUSES_MAX_PINNED", 10),
                default_language: env::var("COURIER_DEFAULT_LANGUAGE")
                    .unwrap_or_else(|_| "en".to_string()),
            },
            polls: PollConfig {
                max_options: env_or("COURIER_POLL_MAX_OPTIONS", 6),
                option_max_chars: env_or("COURIER_POLL_OPTION_MAX_CHARS", 50),
            },
            scheduled: ScheduledStatusConfig {
                max_daily: env_or("COURIER_SCHEDULED_MAX_DAILY", 25),
                max_total: env_or("COURIER_SCHEDULED_MAX_TOTAL", 300),
                min_delay_secs: env_or("COURIER_SCHEDULED_MIN_DELAY_SECS", 300),
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CourierResult<()> {
        if self.instance.host.is_empty() {
            return Err(CourierError::Validation("Host cannot be empty".to_string()));
        }

        if self.instance.protocol != "https" && self.instance.protocol != "http" {
            return Err(CourierError::Validation(format!(
                "Unsupported protocol: {}",
                self.instance.protocol
            )));
        }

        if self.workers.client_workers == 0 || self.workers.federator_workers == 0 {
            return Err(CourierError::Validation(
                "Worker pools need at least one consumer".to_string(),
            ));
        }

        if self.polls.max_options < 2 {
            return Err(CourierError::Validation(
                "Polls need to allow at least two options".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL of this instance
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.instance.protocol, self.instance.host)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_directory = PathBuf::from("./data");
        Self {
            instance: InstanceConfig {
                host: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            storage: StorageConfig {
                database: data_directory.join("courier.sqlite"),
                data_directory,
                max_connections: 10,
            },
            workers: WorkerConfig {
                client_workers: 4,
                federator_workers: 4,
            },
            statuses: StatusConfig {
                max_chars: 5000,
                max_media_files: 6,
                media_description_min_chars: 0,
                media_description_max_chars: 1500,
                max_pinned: 10,
                default_language: "en".to_string(),
            },
            polls: PollConfig {
                max_options: 6,
                option_max_chars: 50,
            },
            scheduled: ScheduledStatusConfig {
                max_daily: 25,
                max_total: 300,
                min_delay_secs: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url(), "http://localhost");
    }

    #[test]
    fn test_validate_rejects_empty_pools() {
        let mut config = ServerConfig::default();
        config.workers.federator_workers = 0;
        assert!(matches!(config.validate(), Err(CourierError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_single_option_polls() {
        let mut config = ServerConfig::default();
        config.polls.max_options = 1;
        assert!(config.validate().is_err());
    }
}
