//! `FERRY_*` environment loader.

use crate::error::ConfigResult;
use crate::model::FerryConfig;
use crate::validate;

/// Static bearer token for the remote store.
pub const STORE_TOKEN: &str = "FERRY_STORE_TOKEN";
/// RPC endpoint base for the remote store.
pub const STORE_API_URL: &str = "FERRY_STORE_API_URL";
/// Content endpoint base for the remote store.
pub const STORE_CONTENT_URL: &str = "FERRY_STORE_CONTENT_URL";
/// Folder receiving uploads.
pub const STORE_ROOT_FOLDER: &str = "FERRY_STORE_ROOT";
/// Public link prefix.
pub const STORE_LINK_BASE: &str = "FERRY_STORE_LINK_BASE";
/// Direct/chunked size threshold in bytes.
pub const UPLOAD_THRESHOLD: &str = "FERRY_UPLOAD_THRESHOLD_BYTES";
/// Session chunk size in bytes.
pub const UPLOAD_CHUNK: &str = "FERRY_UPLOAD_CHUNK_BYTES";
/// Peer-discovery watchdog in seconds.
pub const PEER_TIMEOUT: &str = "FERRY_PEER_TIMEOUT_SECS";
/// Progress cadence in milliseconds.
pub const PROGRESS_INTERVAL: &str = "FERRY_PROGRESS_INTERVAL_MS";
/// Comma-separated payload extensions.
pub const ALLOWED_EXTENSIONS: &str = "FERRY_ALLOWED_EXTENSIONS";
/// Retention window in seconds.
pub const RETENTION: &str = "FERRY_RETENTION_SECS";
/// History length.
pub const HISTORY_LIMIT: &str = "FERRY_HISTORY_LIMIT";
/// Ranked `name=url` metadata sources.
pub const METADATA_SOURCES: &str = "FERRY_METADATA_SOURCES";
/// Metadata request timeout in seconds.
pub const METADATA_TIMEOUT: &str = "FERRY_METADATA_TIMEOUT_SECS";
/// Fallback log level.
pub const LOG_LEVEL: &str = "FERRY_LOG_LEVEL";
/// Log format (`json` or `pretty`).
pub const LOG_FORMAT: &str = "FERRY_LOG_FORMAT";

impl FerryConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] for the first malformed variable.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Unset or blank variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] for the first malformed variable.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.store.access_token = get(STORE_TOKEN).map(|token| token.trim().to_string());
        if let Some(raw) = get(STORE_API_URL) {
            config.store.api_url = validate::parse_http_url("store", "api_url", &raw)?;
        }
        if let Some(raw) = get(STORE_CONTENT_URL) {
            config.store.content_url = validate::parse_http_url("store", "content_url", &raw)?;
        }
        if let Some(raw) = get(STORE_ROOT_FOLDER) {
            config.store.root_folder = validate::parse_folder("store", "root_folder", &raw)?;
        }
        if let Some(raw) = get(STORE_LINK_BASE) {
            config.store.link_base = validate::parse_http_url("store", "link_base", &raw)?;
        }

        if let Some(raw) = get(UPLOAD_THRESHOLD) {
            config.upload.threshold_bytes =
                validate::parse_positive("upload", "threshold_bytes", &raw)?;
        }
        if let Some(raw) = get(UPLOAD_CHUNK) {
            config.upload.chunk_bytes = validate::parse_positive("upload", "chunk_bytes", &raw)?;
        }
        validate::validate_upload(&config.upload)?;

        if let Some(raw) = get(PEER_TIMEOUT) {
            config.acquisition.peer_timeout =
                validate::parse_secs("acquisition", "peer_timeout", &raw)?;
        }
        if let Some(raw) = get(PROGRESS_INTERVAL) {
            config.acquisition.progress_interval =
                validate::parse_millis("acquisition", "progress_interval", &raw)?;
        }
        if let Some(raw) = get(ALLOWED_EXTENSIONS) {
            config.acquisition.allowed_extensions = validate::parse_extensions(&raw)?;
        }

        if let Some(raw) = get(RETENTION) {
            config.orchestrator.retention = validate::parse_secs("orchestrator", "retention", &raw)?;
        }
        if let Some(raw) = get(HISTORY_LIMIT) {
            let limit = validate::parse_positive("orchestrator", "history_limit", &raw)?;
            config.orchestrator.history_limit = usize::try_from(limit).map_err(|_| {
                crate::ConfigError::invalid("orchestrator", "history_limit", &raw, "too_large")
            })?;
        }

        if let Some(raw) = lookup(METADATA_SOURCES) {
            config.metadata.sources = validate::parse_sources(&raw)?;
        }
        if let Some(raw) = get(METADATA_TIMEOUT) {
            config.metadata.request_timeout =
                validate::parse_secs("metadata", "request_timeout", &raw)?;
        }

        if let Some(raw) = get(LOG_LEVEL) {
            config.logging.level = raw.trim().to_string();
        }
        if let Some(raw) = get(LOG_FORMAT) {
            config.logging.format = validate::parse_log_format(&raw)?;
        }

        Ok(config)
    }
}
