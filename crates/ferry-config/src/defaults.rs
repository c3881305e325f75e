//! Default values applied when a `FERRY_*` variable is absent.
//!
//! # Design
//! - Keep every fallback in one place so operators can audit them.
//! - Byte sizes are expressed in MiB multiples.

const MIB: u64 = 1024 * 1024;

/// Remote store RPC endpoint base.
pub const STORE_API_URL: &str = "https://api.dropboxapi.com";
/// Remote store content endpoint base.
pub const STORE_CONTENT_URL: &str = "https://content.dropboxapi.com";
/// Folder receiving uploaded payloads.
pub const STORE_ROOT_FOLDER: &str = "/games";
/// Prefix joined with the remote path to build public links.
pub const STORE_LINK_BASE: &str = "https://www.dropbox.com/home";
/// Sizes strictly below this use a single direct write.
pub const UPLOAD_THRESHOLD_BYTES: u64 = 150 * MIB;
/// Chunk size used by session uploads.
pub const UPLOAD_CHUNK_BYTES: u64 = 8 * MIB;
/// Largest body the remote store accepts in one request.
pub const UPLOAD_REQUEST_LIMIT_BYTES: u64 = 150 * MIB;
/// Peer-discovery watchdog window.
pub const PEER_TIMEOUT_SECS: u64 = 120;
/// Progress sampling cadence.
pub const PROGRESS_INTERVAL_MS: u64 = 1_000;
/// Payload extensions accepted from the swarm.
pub const ALLOWED_EXTENSIONS: &[&str] = &["nsp", "xci", "nsz"];
/// How long finished jobs stay in the active set.
pub const RETENTION_SECS: u64 = 120;
/// Number of finished jobs kept in history.
pub const HISTORY_LIMIT: usize = 50;
/// Ranked metadata sources as `name=url` pairs, highest priority first.
pub const METADATA_SOURCES: &str = "titledb-us=https://raw.githubusercontent.com/blawar/titledb/master/US.en.json,titledb-gb=https://raw.githubusercontent.com/blawar/titledb/master/GB.en.json";
/// Per-request timeout for metadata sources.
pub const METADATA_TIMEOUT_SECS: u64 = 30;
/// Log level used when `RUST_LOG` is unset.
pub const LOG_LEVEL: &str = "info";
/// Log output format.
pub const LOG_FORMAT: &str = "pretty";
