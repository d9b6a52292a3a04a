//! Point d'entrée CLI pour slolidado

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, DownloadArgs};

/// Télécharger les dalles lidar slovènes couvrant une zone d'intérêt
#[derive(Parser)]
#[command(name = "slolidado")]
#[command(author, version)]
#[command(about = "Download Slovenian lidar tiles (ARSO) covering an area of interest")]
#[command(long_about = "Selects the tiles of the national lidar grid touched by an area of interest and downloads them.\n\nDownloads by default. Use 'tiles' or 'urls' to inspect the selection without downloading.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sous-commande (défaut: download)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments du téléchargement (commande par défaut)
    #[command(flatten)]
    download: Option<DownloadArgs>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let args = match cli.command {
        Some(Commands::Tiles(args)) => {
            info!(area = %args.selection.area.display(), "Selecting tiles");
            cli::cmd_tiles(args)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Urls(args)) => {
            cli::cmd_urls(args)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Download(args)) => args,
        None => match cli.download {
            Some(args) => args,
            None => anyhow::bail!("Missing arguments: --area and --output are required"),
        },
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling downloads");
            on_signal.cancel();
        }
    });

    info!(area = %args.selection.area.display(), output = %args.output.display(), "Download");
    let report = cli::cmd_download(args, cancel).await?;

    if report.has_failures() {
        warn!(failed = report.failed, "Some downloads failed, run again to retry them");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
