use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "DocVerify";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_COMPLETED_TOPIC: &str = "document-verification-completed";
pub const DEFAULT_ERROR_TOPIC: &str = "document-verification-error";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Get the application data directory: `~/DocVerify/`.
/// Falls back to the working directory when no home directory is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docverify_lib=info,docverify=info,warn"
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings for the verification worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    /// OCR endpoint. `None` means the OCR capability is unavailable and
    /// extraction runs on fixed sample text.
    pub ocr_endpoint: Option<String>,
    pub ocr_api_key: Option<String>,
    pub ocr_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub completed_topic: String,
    pub error_topic: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let data_dir = app_data_dir();
        Self {
            db_path: data_dir.join("docverify.db"),
            storage_dir: data_dir.join("documents"),
            ocr_endpoint: None,
            ocr_api_key: None,
            ocr_timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            completed_topic: DEFAULT_COMPLETED_TOPIC.to_string(),
            error_topic: DEFAULT_ERROR_TOPIC.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read settings from `DOCVERIFY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("DOCVERIFY_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = get("DOCVERIFY_STORAGE_DIR") {
            config.storage_dir = PathBuf::from(dir);
        }
        config.ocr_endpoint = get("DOCVERIFY_OCR_ENDPOINT");
        config.ocr_api_key = get("DOCVERIFY_OCR_API_KEY");

        if let Some(raw) = get("DOCVERIFY_OCR_TIMEOUT_SECS") {
            let secs = parse_positive("DOCVERIFY_OCR_TIMEOUT_SECS", &raw)?;
            config.ocr_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(raw) = get("DOCVERIFY_MAX_CONCURRENT_REQUESTS") {
            config.max_concurrent_requests = parse_positive("DOCVERIFY_MAX_CONCURRENT_REQUESTS", &raw)?;
        }
        if let Some(topic) = get("DOCVERIFY_COMPLETED_TOPIC") {
            config.completed_topic = topic;
        }
        if let Some(topic) = get("DOCVERIFY_ERROR_TOPIC") {
            config.error_topic = topic;
        }

        Ok(config)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        var,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: usize = raw.trim().parse().map_err(|_| invalid("not a number"))?;
    if value == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(value)
}
