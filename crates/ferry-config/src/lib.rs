#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Environment-driven configuration for the Ferry pipeline.
//!
//! Layout: `model.rs` (typed settings sections), `defaults.rs` (fallback
//! values), `validate.rs` (field parsers), `loader.rs` (`FERRY_*` lookup).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{
    AcquisitionConfig, FerryConfig, LoggingSettings, MetadataConfig, MetadataEndpoint,
    OrchestratorConfig, StoreConfig, UploadConfig,
};
