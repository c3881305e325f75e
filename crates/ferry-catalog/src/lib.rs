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

//! Payload catalog: duplicate detection, indexing and an in-memory store.
//!
//! Layout: `guard.rs` (`DedupGuard`), `indexer.rs` (`CatalogIndexer`),
//! `memory.rs` (`MemoryCatalogStore`).

pub mod guard;
pub mod indexer;
pub mod memory;

pub use guard::{DedupGuard, DuplicateMatch, MatchKind};
pub use indexer::{CatalogIndexer, LAST_INDEX_MARKER};
pub use memory::MemoryCatalogStore;
