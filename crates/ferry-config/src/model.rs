//! Typed configuration sections.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FerryConfig {
    /// Remote store connection.
    pub store: StoreConfig,
    /// Upload strategy tuning.
    pub upload: UploadConfig,
    /// Swarm acquisition tuning.
    pub acquisition: AcquisitionConfig,
    /// Job lifecycle retention.
    pub orchestrator: OrchestratorConfig,
    /// Ranked metadata sources.
    pub metadata: MetadataConfig,
    /// Logging output.
    pub logging: LoggingSettings,
}

impl FerryConfig {
    /// Access the store token, failing when it was not configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when `FERRY_STORE_TOKEN` is unset.
    pub fn require_store_token(&self) -> ConfigResult<&str> {
        self.store
            .access_token
            .as_deref()
            .ok_or(ConfigError::MissingField {
                section: "store",
                field: "access_token",
                variable: crate::loader::STORE_TOKEN,
            })
    }
}

/// Remote store connection settings.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct StoreConfig {
    /// Static bearer token; never logged.
    #[serde(skip)]
    pub access_token: Option<String>,
    /// RPC endpoint base (folder listing).
    pub api_url: String,
    /// Content endpoint base (uploads).
    pub content_url: String,
    /// Folder receiving uploads.
    pub root_folder: String,
    /// Prefix joined with remote paths to build public links.
    pub link_base: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("api_url", &self.api_url)
            .field("content_url", &self.content_url)
            .field("root_folder", &self.root_folder)
            .field("link_base", &self.link_base)
            .finish()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: defaults::STORE_API_URL.to_string(),
            content_url: defaults::STORE_CONTENT_URL.to_string(),
            root_folder: defaults::STORE_ROOT_FOLDER.to_string(),
            link_base: defaults::STORE_LINK_BASE.to_string(),
        }
    }
}

/// Upload strategy tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadConfig {
    /// Sizes strictly below this are written directly.
    pub threshold_bytes: u64,
    /// Session chunk size.
    pub chunk_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: defaults::UPLOAD_THRESHOLD_BYTES,
            chunk_bytes: defaults::UPLOAD_CHUNK_BYTES,
        }
    }
}

/// Swarm acquisition tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionConfig {
    /// Watchdog window for peer discovery.
    pub peer_timeout: Duration,
    /// Progress sampling cadence.
    pub progress_interval: Duration,
    /// Lowercase payload extensions accepted from the swarm.
    pub allowed_extensions: Vec<String>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            peer_timeout: Duration::from_secs(defaults::PEER_TIMEOUT_SECS),
            progress_interval: Duration::from_millis(defaults::PROGRESS_INTERVAL_MS),
            allowed_extensions: defaults::ALLOWED_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Job lifecycle retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrchestratorConfig {
    /// How long terminal jobs stay in the active set.
    pub retention: Duration,
    /// Maximum number of jobs kept in history.
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(defaults::RETENTION_SECS),
            history_limit: defaults::HISTORY_LIMIT,
        }
    }
}

/// One ranked metadata source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataEndpoint {
    /// Short label used in logs.
    pub name: String,
    /// HTTP(S) location of the JSON payload.
    pub url: String,
}

/// Ranked metadata sources; list order is priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataConfig {
    /// Sources, highest priority first.
    pub sources: Vec<MetadataEndpoint>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            sources: crate::validate::parse_sources(defaults::METADATA_SOURCES)
                .unwrap_or_default(),
            request_timeout: Duration::from_secs(defaults::METADATA_TIMEOUT_SECS),
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Level used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: defaults::LOG_FORMAT.to_string(),
        }
    }
}
