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

//! Acquisition adapter over an injected swarm client.
//!
//! Resolves a descriptor, selects the payload file, enforces the extension
//! allow-list and pumps download telemetry into a [`ferry_core::ProgressSink`].
//!
//! Layout: `adapter.rs` (`AcquisitionAdapter`, `AcquiredPayload`),
//! `selection.rs` (payload choice and allow-list), `progress.rs` (telemetry pump).

pub mod adapter;
pub mod progress;
pub mod selection;

pub use adapter::{AcquiredPayload, AcquisitionAdapter, AcquisitionSettings};
pub use progress::{ProgressPump, telemetry_for};
pub use selection::{ExtensionAllowList, select_largest};
