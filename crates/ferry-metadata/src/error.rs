//! Error types for metadata aggregation.

use thiserror::Error;

/// Errors raised while fetching sources or preparing the filename parser.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP client could not be constructed.
    #[error("failed to build metadata http client")]
    ClientBuild {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Request to a source failed at the transport layer.
    #[error("metadata source {name} unreachable")]
    Fetch {
        /// Source label.
        name: String,
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Source answered with a non-success status.
    #[error("metadata source {name} returned status {status}")]
    Status {
        /// Source label.
        name: String,
        /// HTTP status code.
        status: u16,
    },
    /// Source body was not valid JSON.
    #[error("metadata source {name} returned invalid json")]
    Decode {
        /// Source label.
        name: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// Source body was JSON but neither an array nor an object.
    #[error("metadata source {name} returned an unsupported payload shape")]
    Shape {
        /// Source label.
        name: String,
    },
    /// A built-in pattern failed to compile.
    #[error("failed to compile filename pattern")]
    RegexCompile {
        /// Pattern text.
        pattern: &'static str,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Convenience alias for metadata results.
pub type MetadataResult<T> = Result<T, MetadataError>;
