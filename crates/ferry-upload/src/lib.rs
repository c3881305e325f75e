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

//! Upload engine that streams payloads into a remote store.
//!
//! Layout: `strategy.rs` (direct vs chunked selection, session state),
//! `engine.rs` (`UploadEngine`), `dropbox.rs` (HTTP `RemoteStore`).

pub mod dropbox;
pub mod engine;
pub mod strategy;

pub use dropbox::{DropboxConfig, DropboxStore};
pub use engine::UploadEngine;
pub use strategy::{
    DEFAULT_CHUNK_BYTES, DEFAULT_THRESHOLD_BYTES, UploadSession, UploadSettings, UploadStrategy,
    UploadedObject,
};
