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

//! Ferry application wiring: the transfer orchestrator and its service facade.
//!
//! Layout: `orchestrator.rs` (per-job state machine), `jobs.rs` (job store, queue, slot),
//! `progress.rs` (telemetry sink), `rescan.rs` (catalog rebuild), `service.rs` (wiring).

/// Application error types.
pub mod error;
mod jobs;
/// Transfer orchestration.
pub mod orchestrator;
mod progress;
/// Catalog re-scan.
pub mod rescan;
/// Pipeline wiring from configuration.
pub mod service;

pub use error::{AppError, AppResult};
pub use orchestrator::{OrchestratorSettings, Pipeline, TransferOrchestrator};
pub use rescan::{CatalogRescan, RescanReport};
pub use service::{Collaborators, TransferService, dropbox_store};
