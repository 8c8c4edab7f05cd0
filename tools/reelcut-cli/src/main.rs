//! Reelcut CLI: cut highlight reels out of long recordings.
//!
//! Usage:
//!   reelcut compose <SOURCE> --highlights <JSON>   Export a highlight reel
//!   reelcut plan <SOURCE> --highlights <JSON>      Print the edit plan as JSON
//!   reelcut probe <SOURCE>                         Show source media information
//!   reelcut check                                  Check for ffmpeg and ffprobe

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reelcut_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reelcut",
    about = "Compose highlight reels from frame intervals",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the highlights of a video into one reel
    Compose {
        /// Source video
        source: PathBuf,

        /// Highlight intervals (JSON from the analysis service)
        #[arg(long)]
        highlights: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Title stored in the highlight record
        #[arg(long)]
        title: Option<String>,

        /// Write the ffmpeg command line next to the output
        #[arg(long)]
        debug_report: bool,
    },

    /// Print segments, composition and overlays without encoding
    Plan {
        /// Source video
        source: PathBuf,

        /// Highlight intervals (JSON from the analysis service)
        #[arg(long)]
        highlights: PathBuf,
    },

    /// Show probed source media information
    Probe {
        /// Source video
        source: PathBuf,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    reelcut_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Compose {
            source,
            highlights,
            output,
            title,
            debug_report,
        } => {
            commands::compose::run(&config, source, highlights, output, title, debug_report).await
        }
        Commands::Plan { source, highlights } => {
            commands::plan::run(&config, source, highlights).await
        }
        Commands::Probe { source } => commands::probe::run(source).await,
        Commands::Check => commands::check::run(),
    }
}
