//! Profile Summary server
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments, setting up logging and handling top-level errors.

use anyhow::Context;
use clap::{Parser, Subcommand};
use profile_summary::{server, AppState, Config, SummaryRequest};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "profile-summary")]
#[command(author, version, about = "LLM profile summaries for the Avery's Inbox ethics activity", long_about = None)]
struct Cli {
    /// Path to profile-summary.toml (defaults to ./profile-summary.toml, then ~/.config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the summary endpoint over HTTP
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Summarise a single request body read from a file
    Summarise {
        /// JSON request body, as the simulation would POST it
        request: PathBuf,
        /// Print the generated prompt instead of calling the API
        #[arg(long)]
        prompt: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Summarise { request, prompt }) => {
            let body = std::fs::read(&request)
                .with_context(|| format!("failed to read {}", request.display()))?;
            let request = SummaryRequest::from_slice(&body)?;

            if prompt {
                // Dry run: show what would be sent
                println!("{}", server::prepare_prompt(&config, &request).await);
            } else {
                let state = AppState::new(config)?;
                let summary = server::summarize(&state, &request).await?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Some(Commands::Serve { bind }) => serve(config, bind).await?,
        None => serve(config, None).await?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}

async fn serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    tracing::info!(
        "profile-summary v{} starting (model {})",
        env!("CARGO_PKG_VERSION"),
        config.groq.model
    );
    let state = AppState::new(config)?;
    server::run(state, &bind).await
}
