use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use ferry_app::dropbox_store;
use ferry_core::{DownloadTelemetry, ProgressSink};
use ferry_upload::{UploadEngine, UploadSettings, UploadedObject};

use crate::cli::UploadArgs;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::{format_bytes, render_uploaded};

/// Reports upload progress on stderr so stdout stays machine-readable.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn download(&self, _telemetry: DownloadTelemetry) {}

    fn upload(&self, bytes_uploaded: u64, bytes_total: u64) {
        eprintln!(
            "uploaded {} of {}",
            format_bytes(bytes_uploaded),
            format_bytes(bytes_total)
        );
    }
}

pub(crate) async fn handle_upload(ctx: &CliContext, args: UploadArgs) -> CliResult<()> {
    let store = dropbox_store(&ctx.config).map_err(CliError::failure)?;
    let engine = UploadEngine::new(
        Arc::new(store),
        UploadSettings {
            threshold_bytes: ctx.config.upload.threshold_bytes,
            chunk_bytes: ctx.config.upload.chunk_bytes,
        },
    );
    let uploaded = upload_file(
        &engine,
        &args.path,
        &ctx.config.store.root_folder,
        args.name.as_deref(),
    )
    .await?;
    render_uploaded(&uploaded, ctx.output)
}

/// Stream the local file at `path` into `root_folder`.
pub(crate) async fn upload_file(
    engine: &UploadEngine,
    path: &Path,
    root_folder: &str,
    name: Option<&str>,
) -> CliResult<UploadedObject> {
    let file_name = match name {
        Some(name) => name.trim().to_string(),
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_default(),
    };
    if file_name.is_empty() || file_name.contains('/') {
        return Err(CliError::validation(format!(
            "cannot derive a remote file name from {}",
            path.display()
        )));
    }

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))
        .map_err(CliError::failure)?;
    let total = file
        .metadata()
        .await
        .with_context(|| format!("failed to stat {}", path.display()))
        .map_err(CliError::failure)?
        .len();
    let destination = format!("{}/{file_name}", root_folder.trim_end_matches('/'));

    engine
        .upload(Box::new(file), &destination, total, &StderrProgress)
        .await
        .map_err(CliError::failure)
}
