//! Configuration management for the Line Trace platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LTP_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, staging, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Item catalog configuration
    pub catalog: CatalogConfig,

    /// Seed the development sample catalog on startup
    pub sample_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. "sqlite://bom_database_dev.db"
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Which item directory backs catalog reads
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// The local items table is authoritative
    Local,
    /// Read through the external product-master mirror, falling back to
    /// the local catalog when the mirror has no match
    Mirror,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub mode: CatalogMode,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("LTP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5002)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "sqlite://bom_database_dev.db")?
            .set_default("database.max_connections", 5)?
            .set_default("catalog.mode", "local")?
            .set_default("sample_data", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LTP_ prefix)
            .add_source(
                Environment::with_prefix("LTP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5002,
            host: "0.0.0.0".to_string(),
        }
    }
}
