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

//! Fuzzy metadata index built from ranked remote title databases.
//!
//! Layout: `keys.rs` (lookup-key derivations), `index.rs` (`FuzzyIndex` and
//! the swappable `SharedIndex`), `sources.rs` (HTTP aggregation),
//! `filename.rs` (payload filename parsing).

pub mod error;
pub mod filename;
pub mod index;
pub mod keys;
pub mod sources;

pub use error::{MetadataError, MetadataResult};
pub use filename::{FilenameParser, ParsedFilename};
pub use index::{FuzzyIndex, SharedIndex};
pub use keys::{derive_keys, strip_decorations};
pub use sources::{AggregationReport, Aggregator, MetadataSource, SourceReport};
