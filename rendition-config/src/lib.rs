//! Configuration management for the rendition engine

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_VIDEO_URL_BASE: &str = "https://example.com/videos";
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which encode code path to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderBackend {
    /// Hardware when the platform has it, software otherwise
    Auto,
    Software,
    Videotoolbox,
    Nvenc,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Console,
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Uploaded files waiting for processing
    pub pending_dir: PathBuf,
    /// Renditions are written under `{completed_dir}/{video_id}/`
    pub completed_dir: PathBuf,
    pub video_url_base: String,
    pub max_workers: usize,
    pub encoder_backend: EncoderBackend,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub encode_timeout_secs: Option<u64>,
    pub database_url: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let builder = Self::defaults()?.add_source(Environment::default().try_parsing(true));
        Self::from_builder(builder)
    }

    /// Defaults for every key, before any source is layered on top
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = Config::builder()
            .set_default("pending_dir", "./data/pending")?
            .set_default("completed_dir", "./data/completed")?
            .set_default("video_url_base", DEFAULT_VIDEO_URL_BASE)?
            .set_default("max_workers", DEFAULT_MAX_WORKERS as i64)?
            .set_default("encoder_backend", "auto")?
            .set_default("ffmpeg_path", "ffmpeg")?
            .set_default("ffprobe_path", "ffprobe")?
            .set_default("log_level", "info")?
            .set_default("log_format", "console")?;
        Ok(builder)
    }

    /// Build, deserialize and validate
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if config.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "MAX_WORKERS must be at least 1".to_string(),
            ));
        }
        if config.database_url.as_deref().is_some_and(|url| url.trim().is_empty()) {
            config.database_url = None;
        }
        config.video_url_base = config.video_url_base.trim_end_matches('/').to_string();

        Ok(config)
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }

    pub fn encode_timeout(&self) -> Option<Duration> {
        self.encode_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
