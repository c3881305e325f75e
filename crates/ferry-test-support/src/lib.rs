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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (payload bytes, catalog records), progress.rs (recording progress sink), remote.rs (recording remote store), swarm.rs (scripted swarm client), catalog.rs (failing catalog store).

pub mod catalog;
pub mod fixtures;
pub mod progress;
pub mod remote;
pub mod swarm;
