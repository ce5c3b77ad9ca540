//! Configuration module
//!
//! This module provides the process configuration for the API server and the
//! metadata pipeline: listen port, environment, size ceilings, fetch timeout and
//! transient blob store timings.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    BLOB_SWEEP_INTERVAL_SECS, BLOB_TTL_SECS, DEFAULT_PORT, FETCH_TIMEOUT_SECS, MAX_BATCH_URLS,
    MAX_IMAGE_BYTES,
};

/// Log output format for the tracing subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Unknown LOG_FORMAT '{}'", other)),
        }
    }
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
}

/// Metadata pipeline configuration
#[derive(Clone, Debug)]
pub struct MetadataConfig {
    pub base: BaseConfig,
    pub max_image_bytes: usize,
    pub max_upload_bytes: usize,
    pub fetch_timeout_secs: u64,
    pub blob_ttl_secs: u64,
    pub blob_sweep_interval_secs: u64,
    pub max_batch_urls: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MetadataConfig>);

impl Default for Config {
    fn default() -> Self {
        Config(Box::new(MetadataConfig::default()))
    }
}

impl Config {
    fn as_metadata(&self) -> &MetadataConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_metadata().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = MetadataConfig::from_lookup(|key| env::var(key).ok())?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_metadata().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_metadata().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_metadata().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_metadata().base.environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_metadata().base.log_format
    }

    pub fn max_image_bytes(&self) -> usize {
        self.as_metadata().max_image_bytes
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.as_metadata().max_upload_bytes
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.as_metadata().fetch_timeout_secs)
    }

    pub fn blob_ttl(&self) -> Duration {
        Duration::from_secs(self.as_metadata().blob_ttl_secs)
    }

    pub fn blob_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.as_metadata().blob_sweep_interval_secs)
    }

    pub fn max_batch_urls(&self) -> usize {
        self.as_metadata().max_batch_urls
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig {
            base: BaseConfig {
                server_port: DEFAULT_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                log_format: LogFormat::Text,
            },
            max_image_bytes: MAX_IMAGE_BYTES,
            max_upload_bytes: MAX_IMAGE_BYTES + (1 << 20),
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            blob_ttl_secs: BLOB_TTL_SECS,
            blob_sweep_interval_secs: BLOB_SWEEP_INTERVAL_SECS,
            max_batch_urls: MAX_BATCH_URLS,
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl MetadataConfig {
    /// Build the configuration from a key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = lookup("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // PORT may be given as ":8080"
        let server_port = parse_or(
            lookup("PORT").map(|p| p.trim().trim_start_matches(':').to_string()),
            DEFAULT_PORT,
        );

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::Text,
        };

        let max_image_bytes = parse_or(lookup("MAX_IMAGE_BYTES"), MAX_IMAGE_BYTES);
        let max_upload_bytes = parse_or(
            lookup("MAX_UPLOAD_BYTES"),
            max_image_bytes.saturating_add(1 << 20),
        );

        Ok(MetadataConfig {
            base: BaseConfig {
                server_port,
                cors_origins,
                environment,
                log_format,
            },
            max_image_bytes,
            max_upload_bytes,
            fetch_timeout_secs: parse_or(lookup("FETCH_TIMEOUT_SECS"), FETCH_TIMEOUT_SECS),
            blob_ttl_secs: parse_or(lookup("BLOB_TTL_SECS"), BLOB_TTL_SECS),
            blob_sweep_interval_secs: parse_or(
                lookup("BLOB_SWEEP_INTERVAL_SECS"),
                BLOB_SWEEP_INTERVAL_SECS,
            ),
            max_batch_urls: parse_or(lookup("MAX_BATCH_URLS"), MAX_BATCH_URLS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_image_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_BYTES must be greater than 0"));
        }

        if self.max_upload_bytes < self.max_image_bytes {
            return Err(anyhow::anyhow!(
                "MAX_UPLOAD_BYTES ({}) must not be below MAX_IMAGE_BYTES ({})",
                self.max_upload_bytes,
                self.max_image_bytes
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(anyhow::anyhow!("FETCH_TIMEOUT_SECS must be greater than 0"));
        }

        if self.blob_ttl_secs == 0 {
            return Err(anyhow::anyhow!("BLOB_TTL_SECS must be greater than 0"));
        }

        if self.blob_sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "BLOB_SWEEP_INTERVAL_SECS must be greater than 0"
            ));
        }

        if self.max_batch_urls == 0 {
            return Err(anyhow::anyhow!("MAX_BATCH_URLS must be greater than 0"));
        }

        if self.base.cors_origins.is_empty() {
            return Err(anyhow::anyhow!("CORS_ORIGINS must list at least one origin"));
        }

        Ok(())
    }
}
