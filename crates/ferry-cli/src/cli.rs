//! Argument parsing, logging setup and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ferry_config::FerryConfig;
use ferry_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, init_logging};
use tracing::debug;

use crate::commands::catalog::handle_rescan;
use crate::commands::metadata::{handle_lookup, handle_metadata_build, handle_parse};
use crate::commands::upload::handle_upload;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::render_config;

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let config = FerryConfig::from_env()
        .map_err(|err| CliError::validation(format!("invalid configuration: {err}")))?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&LoggingConfig {
        level: &level,
        format: LogFormat::from_label(&config.logging.format),
        ..LoggingConfig::default()
    })
    .map_err(CliError::failure)?;
    let _guard = GlobalContextGuard::new("cli");
    debug!(command = command_label(&cli.command), "dispatching command");

    let ctx = CliContext {
        config,
        output: cli.output,
    };
    dispatch(cli.command, &ctx).await
}

async fn dispatch(command: Command, ctx: &CliContext) -> CliResult<()> {
    match command {
        Command::Parse(args) => handle_parse(ctx, args).await,
        Command::Metadata(metadata) => match metadata {
            MetadataCommand::Build => handle_metadata_build(ctx).await,
            MetadataCommand::Lookup(args) => handle_lookup(ctx, args).await,
        },
        Command::Upload(args) => handle_upload(ctx, args).await,
        Command::Rescan => handle_rescan(ctx).await,
        Command::Config => render_config(&ctx.config, ctx.output),
    }
}

#[derive(Parser)]
#[command(name = "ferry", about = "Operator CLI for the ferry transfer pipeline")]
pub(crate) struct Cli {
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(long, global = true, help = "Override the configured log level")]
    pub(crate) log_level: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract title, identifier and version from payload filenames.
    Parse(ParseArgs),
    /// Build or query the fuzzy metadata index.
    #[command(subcommand)]
    Metadata(MetadataCommand),
    /// Upload a local file into the remote root folder.
    Upload(UploadArgs),
    /// Rebuild the catalog from the remote root folder and print it.
    Rescan,
    /// Print the effective configuration (the store token is never shown).
    Config,
}

#[derive(Subcommand)]
pub(crate) enum MetadataCommand {
    /// Fetch every source and report what each contributed.
    Build,
    /// Resolve a title name to its canonical identifier.
    Lookup(LookupArgs),
}

#[derive(Args)]
pub(crate) struct ParseArgs {
    #[arg(required = true, help = "Payload filenames to parse")]
    pub(crate) filenames: Vec<String>,
    #[arg(long, help = "Skip the metadata index; only explicit annotations are used")]
    pub(crate) offline: bool,
}

#[derive(Args)]
pub(crate) struct LookupArgs {
    #[arg(help = "Title name as it appears in a filename or listing")]
    pub(crate) name: String,
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    #[arg(help = "Local file to upload")]
    pub(crate) path: PathBuf,
    #[arg(long, help = "Remote file name (defaults to the local file name)")]
    pub(crate) name: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Parse(_) => "parse",
        Command::Metadata(MetadataCommand::Build) => "metadata_build",
        Command::Metadata(MetadataCommand::Lookup(_)) => "metadata_lookup",
        Command::Upload(_) => "upload",
        Command::Rescan => "rescan",
        Command::Config => "config",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_many_filenames_and_global_output() {
        let cli = Cli::try_parse_from([
            "ferry",
            "parse",
            "a [0100000000010000].nsp",
            "b.xci",
            "--offline",
            "--output",
            "json",
        ])
        .expect("arguments parse");
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::Parse(args) = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(args.filenames.len(), 2);
        assert!(args.offline);
    }

    #[test]
    fn parse_requires_a_filename() {
        assert!(Cli::try_parse_from(["ferry", "parse"]).is_err());
    }

    #[test]
    fn upload_takes_path_and_optional_name() {
        let cli = Cli::try_parse_from(["ferry", "upload", "/tmp/game.nsp", "--name", "x.nsp"])
            .expect("arguments parse");
        assert_eq!(command_label(&cli.command), "upload");
        let Command::Upload(args) = cli.command else {
            panic!("expected upload command");
        };
        assert_eq!(args.path, PathBuf::from("/tmp/game.nsp"));
        assert_eq!(args.name.as_deref(), Some("x.nsp"));
    }

    #[test]
    fn metadata_lookup_is_nested() {
        let cli = Cli::try_parse_from(["ferry", "--format", "table", "metadata", "lookup", "Celeste"])
            .expect("arguments parse");
        assert_eq!(command_label(&cli.command), "metadata_lookup");
    }
}
