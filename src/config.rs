use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "INTERVIEW_RECORDER_CONFIG";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5555/api";
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_UPLOAD_MAX_RETRIES: u8 = 2;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Base of the admin backend API, e.g. `http://localhost:5555/api`.
    pub api_base_url: String,
    pub upload_url: Option<String>,
    pub upload_token: Option<String>,
    pub upload_timeout_secs: u64,
    pub upload_max_retries: u8,
    pub submit_timeout_secs: u64,
    pub tick_interval_ms: u64,
    pub input_device_name: Option<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_url: None,
            upload_token: None,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            upload_max_retries: DEFAULT_UPLOAD_MAX_RETRIES,
            submit_timeout_secs: DEFAULT_SUBMIT_TIMEOUT_SECS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            input_device_name: None,
        }
    }
}

/// Loads `.env`, then the JSON file named by `INTERVIEW_RECORDER_CONFIG` (if any), then applies
/// `INTERVIEW_*` environment overrides.
pub fn load() -> Result<RecorderConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let mut config = match env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.trim().is_empty()) {
        Some(path) => load_file(Path::new(path.trim()))?,
        None => RecorderConfig::default(),
    };

    apply_overrides(&mut config, |key| env::var(key).ok())?;
    normalize_config(&mut config);

    tracing::info!(
        "Config loaded: api={}, upload={}, tick={}ms",
        config.api_base_url,
        config.upload_url.as_deref().unwrap_or("<unset>"),
        config.tick_interval_ms
    );
    Ok(config)
}

pub fn load_file(path: &Path) -> Result<RecorderConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: RecorderConfig =
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    normalize_config(&mut config);
    Ok(config)
}

fn apply_overrides<F>(config: &mut RecorderConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("INTERVIEW_API_BASE_URL") {
        config.api_base_url = url;
    }
    if let Some(url) = lookup("INTERVIEW_UPLOAD_URL") {
        config.upload_url = Some(url);
    }
    if let Some(token) = lookup("INTERVIEW_UPLOAD_TOKEN") {
        config.upload_token = Some(token);
    }
    if let Some(device) = lookup("INTERVIEW_INPUT_DEVICE") {
        config.input_device_name = Some(device);
    }
    if let Some(value) = lookup("INTERVIEW_UPLOAD_TIMEOUT_SECS") {
        config.upload_timeout_secs = parse_number("INTERVIEW_UPLOAD_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = lookup("INTERVIEW_UPLOAD_MAX_RETRIES") {
        config.upload_max_retries = parse_number("INTERVIEW_UPLOAD_MAX_RETRIES", &value)?;
    }
    if let Some(value) = lookup("INTERVIEW_SUBMIT_TIMEOUT_SECS") {
        config.submit_timeout_secs = parse_number("INTERVIEW_SUBMIT_TIMEOUT_SECS", &value)?;
    }
    if let Some(value) = lookup("INTERVIEW_TICK_INTERVAL_MS") {
        config.tick_interval_ms = parse_number("INTERVIEW_TICK_INTERVAL_MS", &value)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}

fn normalize_config(config: &mut RecorderConfig) {
    let base = config.api_base_url.trim().trim_end_matches('/');
    config.api_base_url = if base.is_empty() {
        DEFAULT_API_BASE_URL.to_string()
    } else {
        base.to_string()
    };
    config.upload_url = normalize_optional(config.upload_url.take());
    config.upload_token = normalize_optional(config.upload_token.take());
    config.input_device_name = normalize_optional(config.input_device_name.take());

    if config.upload_timeout_secs == 0 {
        config.upload_timeout_secs = DEFAULT_UPLOAD_TIMEOUT_SECS;
    }
    if config.submit_timeout_secs == 0 {
        config.submit_timeout_secs = DEFAULT_SUBMIT_TIMEOUT_SECS;
    }
    if config.tick_interval_ms == 0 {
        config.tick_interval_ms = DEFAULT_TICK_INTERVAL_MS;
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
