use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "finsync", version, about = "Incrementally download OFX statements")]
struct Cli {
    /// Default log level; `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download new statements for one or more profiles.
    Sync(SyncArgs),
    /// Rename statement files so their dates match their contents.
    Rename {
        /// Report what would be renamed without touching any file.
        #[arg(long)]
        dry_run: bool,
        /// Statement files, or directories of them.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the intervals and gaps of one account directory.
    Coverage { dir: PathBuf },
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Config file; defaults to `config.toml` in the platform config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Profile to sync; may be repeated.
    #[arg(long = "profile", value_name = "NAME", conflicts_with_all = ["all", "spec"])]
    pub profiles: Vec<String>,

    /// Sync every profile in the config file.
    #[arg(long, conflicts_with = "spec")]
    pub all: bool,

    /// A single profile given inline as JSON instead of a config file.
    #[arg(long, value_name = "JSON")]
    pub spec: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let result = match cli.command {
        Command::Sync(args) => commands::sync(args).await,
        Command::Rename { dry_run, paths } => commands::rename(&paths, dry_run),
        Command::Coverage { dir } => commands::coverage(&dir),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
