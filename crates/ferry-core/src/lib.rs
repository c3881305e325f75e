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

//! Engine-agnostic transfer interfaces and DTOs.
//!
//! Layout: `model/` (jobs, descriptors, catalog records), `service/`
//! (collaborator traits for the swarm, remote store and catalog store),
//! `error.rs` (the transfer error taxonomy).

pub mod error;
pub mod model;
pub mod service;

pub use error::{BoxError, TransferError, TransferResult};
pub use ferry_events::{JobPhase, SourceKind};
pub use model::{
    CatalogEntry, CatalogFilter, CommitInfo, DownloadTelemetry, JobListing, MAX_TORRENT_FILE_BYTES,
    RemoteFile, SwarmFile, SwarmStats, TransferDescriptor, TransferJob, TransferProgress,
};
pub use service::{
    ByteSource, CatalogStore, NoopProgress, ProgressSink, RemoteStore, SwarmClient, SwarmHandle,
};
