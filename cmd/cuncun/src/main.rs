//! cuncun - Feishu chat bot that replies in text and, when a recorded clip
//! says the same thing, in voice.

mod app;
mod bot;
mod commands;
mod config;
mod dedup;
mod logging;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "cuncun")]
#[command(about = "Feishu chat bot with voice-clip replies")]
#[command(version)]
struct Cli {
    /// YAML config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Match a reply text against the voice library
    Match {
        text: String,
    },
    /// Build the voice library index from a JSONL manifest of {filename, text}
    Ingest {
        manifest: PathBuf,
    },
    /// Snapshot the history database into BACKUP_DIR and prune old snapshots
    Backup,
    /// Delete one user's chat history
    ClearHistory {
        open_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv_err = config::load_dotenv(None);
    let cfg = Config::load(cli.config.as_deref())?;
    let _guard = logging::init(cfg.log_file.as_deref(), cli.verbose)?;
    if let Some(e) = dotenv_err {
        warn!(error = %e, "config: failed to read .env");
    }

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(cfg.port);
            let bot = app::bot(&cfg)?;
            info!(port, pool = cfg.worker_pool_size, "cuncun: starting");
            let state = server::AppState::new(
                bot,
                cfg.worker_pool_size,
                cfg.encrypt_key().map(str::to_string),
            )
            .with_verify_token(Some(cfg.feishu_verify_token.clone()));
            server::serve(state, port).await
        }
        Commands::Match { text } => commands::run_match(&cfg, &text).await,
        Commands::Ingest { manifest } => commands::run_ingest(&cfg, &manifest).await,
        Commands::Backup => commands::run_backup(&cfg),
        Commands::ClearHistory { open_id } => commands::run_clear_history(&cfg, &open_id),
    }
}
