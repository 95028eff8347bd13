/// Configuration management for the workloom engine
///
/// Handles server binding, database location, and optional notifier
/// endpoints. Everything is overridable through environment variables for
/// container deployment.

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Optional notifier endpoints per messaging channel
    pub notifiers: NotifierConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// SQLite storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file (default: "data")
    pub data_dir: String,
}

/// Incoming-webhook URLs for the messaging channels
///
/// A channel without a URL runs in simulation mode; its nodes report
/// `simulated: true` instead of dispatching anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub slack_webhook_url: Option<String>,
    pub discord_webhook_url: Option<String>,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("WORKLOOM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("WORKLOOM_PORT")
                    .unwrap_or_else(|_| "3007".to_string())
                    .parse()
                    .unwrap_or(3007),
            },
            database: DatabaseConfig {
                data_dir: std::env::var("WORKLOOM_DATA_DIR")
                    .unwrap_or_else(|_| "data".to_string()),
            },
            notifiers: NotifierConfig {
                slack_webhook_url: std::env::var("WORKLOOM_SLACK_WEBHOOK").ok(),
                discord_webhook_url: std::env::var("WORKLOOM_DISCORD_WEBHOOK").ok(),
            },
        }
    }
}
