use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::analyzer::BucketGranularity;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Server and analysis-default configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// Directory for the file-backed pattern store; in-memory when unset
    pub store_path: Option<String>,

    /// Default time-bucket granularity for access counts
    pub bucket_granularity: BucketGranularity,

    /// Minimum predicate hits before a column becomes a candidate
    #[validate(range(
        min = 1,
        max = 100,
        message = "Min hit threshold must be between 1 and 100"
    ))]
    pub min_hit_threshold: u64,

    /// Default analysis window length in days
    #[validate(range(
        min = 1,
        max = 365,
        message = "Window days must be between 1 and 365"
    ))]
    pub window_days: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            store_path: None,
            bucket_granularity: BucketGranularity::Week,
            min_hit_threshold: 2,
            window_days: 30,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("QUERYPATTERNS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("QUERYPATTERNS_PORT", "8080")?,
            store_path: env::var("QUERYPATTERNS_STORE_PATH").ok(),
            bucket_granularity: parse_env_var("QUERYPATTERNS_BUCKET", "week")?,
            min_hit_threshold: parse_env_var("QUERYPATTERNS_MIN_HITS", "2")?,
            window_days: parse_env_var("QUERYPATTERNS_WINDOW_DAYS", "30")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let bucket_granularity =
            cli.bucket
                .parse::<BucketGranularity>()
                .map_err(|e| ConfigError::Parse {
                    field: "bucket".to_string(),
                    value: cli.bucket.clone(),
                    source: Box::new(e),
                })?;

        let config = Self {
            http_host: cli.http_host,
            http_port: cli.http_port,
            store_path: cli.store_path,
            bucket_granularity,
            min_hit_threshold: cli.min_hit_threshold,
            window_days: cli.window_days,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub http_host: String,
    pub http_port: u16,
    pub store_path: Option<String>,
    pub bucket: String,
    pub min_hit_threshold: u64,
    pub window_days: u64,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
