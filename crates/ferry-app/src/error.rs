//! # Design
//!
//! - Centralize application-level errors for wiring and catalog maintenance.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration was missing or invalid.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ferry_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: ferry_telemetry::TelemetryError,
    },
    /// Metadata index construction failed.
    #[error("metadata operation failed")]
    Metadata {
        /// Operation identifier.
        operation: &'static str,
        /// Source metadata error.
        source: ferry_metadata::MetadataError,
    },
    /// A transfer-pipeline collaborator failed.
    #[error("transfer operation failed")]
    Transfer {
        /// Operation identifier.
        operation: &'static str,
        /// Source transfer error.
        source: ferry_core::TransferError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: ferry_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: ferry_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn metadata(
        operation: &'static str,
        source: ferry_metadata::MetadataError,
    ) -> Self {
        Self::Metadata { operation, source }
    }

    pub(crate) const fn transfer(
        operation: &'static str,
        source: ferry_core::TransferError,
    ) -> Self {
        Self::Transfer { operation, source }
    }
}
