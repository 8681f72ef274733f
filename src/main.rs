//! Main entry point for the translation proxy

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use translation_proxy::cli::commands::{self, Commands};
use translation_proxy::ProxyConfig;

/// Translation Proxy - cloud translation and text-to-speech behind one HTTP API
#[derive(Parser, Debug)]
#[command(name = "translation-proxy", version, about, long_about = None)]
struct Args {
    /// Optional configuration file (JSON, TOML or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("translation_proxy={},tower_http={}", default_level, default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::load(args.config.as_deref())?;

    // Execute command
    match args.command {
        Some(Commands::Server { host, port }) => {
            commands::handle_server(config, host, port).await?;
        }
        Some(Commands::Translate { text, target_lang }) => {
            commands::handle_translate(config, text, target_lang).await?;
        }
        Some(Commands::Batch { file, target_lang }) => {
            commands::handle_batch(config, file, target_lang).await?;
        }
        Some(Commands::CheckCredentials) => {
            commands::handle_check_credentials(config).await?;
        }
        None => {
            commands::handle_server(config, None, None).await?;
        }
    }

    Ok(())
}
