//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use ferry_app::RescanReport;
use ferry_config::FerryConfig;
use ferry_core::CatalogEntry;
use ferry_metadata::{AggregationReport, ParsedFilename};
use ferry_upload::UploadedObject;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

/// One parsed filename alongside its input.
#[derive(Debug, Serialize)]
pub(crate) struct ParsedRow {
    pub(crate) filename: String,
    #[serde(flatten)]
    pub(crate) parsed: ParsedFilename,
}

#[derive(Serialize)]
struct LookupResult<'a> {
    name: &'a str,
    title_id: Option<&'a str>,
}

#[derive(Serialize)]
struct CatalogListing<'a> {
    report: &'a RescanReport,
    entries: &'a [CatalogEntry],
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_parsed(rows: &[ParsedRow], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(rows)?,
        OutputFormat::Table => {
            println!("{:<16} {:>10} {:<40} FILE", "TITLE ID", "VERSION", "NAME");
            for row in rows {
                println!(
                    "{:<16} {:>10} {:<40} {}",
                    row.parsed.title_id.as_deref().unwrap_or("-"),
                    row.parsed
                        .version
                        .map_or_else(|| "-".to_string(), |version| version.to_string()),
                    row.parsed.clean_name,
                    row.filename
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_lookup(
    name: &str,
    title_id: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&LookupResult { name, title_id })?,
        OutputFormat::Table => match title_id {
            Some(id) => println!("{id}  {name}"),
            None => println!("no match for {name}"),
        },
    }
    Ok(())
}

pub(crate) fn render_aggregation(
    report: &AggregationReport,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(report)?,
        OutputFormat::Table => {
            println!("{:>4} {:>8} {:>8} SOURCE", "RANK", "RECORDS", "KEYS");
            for source in &report.sources {
                println!(
                    "{:>4} {:>8} {:>8} {}",
                    source.priority, source.records, source.keys_added, source.name
                );
            }
            for name in &report.failed {
                println!("failed source: {name}");
            }
            println!("index keys: {}", report.keys);
        }
    }
    Ok(())
}

pub(crate) fn render_uploaded(uploaded: &UploadedObject, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(uploaded)?,
        OutputFormat::Table => {
            println!("path: {}", uploaded.path);
            println!("url: {}", uploaded.url);
            println!(
                "size: {} ({} upload)",
                format_bytes(uploaded.size_bytes),
                uploaded.strategy
            );
        }
    }
    Ok(())
}

pub(crate) fn render_catalog(
    report: &RescanReport,
    entries: &[CatalogEntry],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&CatalogListing { report, entries })?,
        OutputFormat::Table => {
            println!("{:<16} {:>10} {:>12} PATH", "TITLE ID", "VERSION", "SIZE");
            for entry in entries {
                println!(
                    "{:<16} {:>10} {:>12} {}",
                    entry.title_id.as_deref().unwrap_or("-"),
                    entry
                        .version
                        .map_or_else(|| "-".to_string(), |version| version.to_string()),
                    format_bytes(entry.size_bytes),
                    entry.path
                );
            }
            println!(
                "listed {} / indexed {} / skipped {}",
                report.listed, report.indexed, report.skipped
            );
        }
    }
    Ok(())
}

pub(crate) fn render_config(config: &FerryConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            let token = if config.store.access_token.is_some() {
                "set"
            } else {
                "missing"
            };
            println!("store token: {token}");
            println!("store api: {}", config.store.api_url);
            println!("store content: {}", config.store.content_url);
            println!("root folder: {}", config.store.root_folder);
            println!(
                "upload: threshold {} / chunk {}",
                format_bytes(config.upload.threshold_bytes),
                format_bytes(config.upload.chunk_bytes)
            );
            println!(
                "peer timeout: {}s, retention: {}s, history: {}",
                config.acquisition.peer_timeout.as_secs(),
                config.orchestrator.retention.as_secs(),
                config.orchestrator.history_limit
            );
            println!(
                "allowed extensions: {}",
                config.acquisition.allowed_extensions.join(", ")
            );
            for (rank, source) in config.metadata.sources.iter().enumerate() {
                println!("metadata source {}: {} ({})", rank + 1, source.name, source.url);
            }
            println!(
                "logging: {} ({})",
                config.logging.level, config.logging.format
            );
        }
    }
    Ok(())
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
