//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::core::batch::{BatchDispatcher, BatchEntry};
use crate::core::client::{MicrosoftTranslator, Translator};
use crate::core::config::ProxyConfig;
use crate::core::credentials::CredentialSource;

/// Commands for the translation proxy
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP proxy server
    Server {
        /// Bind address (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (defaults to PORT or the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Translate a single text
    Translate {
        /// Text to translate
        #[arg(long)]
        text: String,

        /// Target language code
        #[arg(short, long)]
        target_lang: String,
    },

    /// Translate every non-empty line of a file as one batch
    Batch {
        /// Input file, one text per line
        #[arg(short, long)]
        file: PathBuf,

        /// Target language code
        #[arg(short, long)]
        target_lang: String,
    },

    /// Check which API keys can be resolved
    CheckCredentials,
}

/// Handle server command
pub async fn handle_server(
    mut config: ProxyConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    use crate::server::api::run_server;

    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    // Refuse to start without both keys
    let credentials = CredentialSource::new(&config).resolve()?;

    info!("Starting HTTP server on {}", config.bind_address());
    println!("🚀 Server starting on http://{}", config.bind_address());
    println!("📄 OpenAPI document: http://{}/api-docs/openapi.json", config.bind_address());

    run_server(config, credentials).await
}

/// Handle single translation command
pub async fn handle_translate(config: ProxyConfig, text: String, target_lang: String) -> anyhow::Result<()> {
    let credentials = CredentialSource::new(&config).resolve()?;
    let translator = MicrosoftTranslator::from_config(&config, &credentials)?;

    let translated = translator.translate(&text, &target_lang).await?;
    println!("{}", translated);

    Ok(())
}

/// Handle batch translation command
pub async fn handle_batch(config: ProxyConfig, file: PathBuf, target_lang: String) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let content = std::fs::read_to_string(&file)?;
    let entries: Vec<BatchEntry> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(BatchEntry::from)
        .collect();

    info!("Read {} texts from {}", entries.len(), file.display());

    let credentials = CredentialSource::new(&config).resolve()?;
    let translator: Arc<dyn Translator> = Arc::new(MicrosoftTranslator::from_config(&config, &credentials)?);
    let dispatcher = BatchDispatcher::new(translator, config.max_batch_size, config.item_timeout());

    let items = dispatcher.validate(&entries, Some(target_lang.as_str()))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Translating {} texts into {}", items.len(), target_lang));
    pb.enable_steady_tick(Duration::from_millis(100));

    let report = dispatcher.dispatch(items).await;
    pb.finish_and_clear();
    let report = report?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!(
        "\n✅ Batch completed: {}/{} successful ({})",
        report.summary.successful, report.summary.total, report.summary.success_rate_percent
    );

    Ok(())
}

/// Handle check credentials command
pub async fn handle_check_credentials(config: ProxyConfig) -> anyhow::Result<()> {
    let (translator, tts) = CredentialSource::new(&config).availability();

    let describe = |source: Option<crate::core::credentials::KeySource>| match source {
        Some(source) => format!("✅ found ({})", source),
        None => "❌ missing".to_string(),
    };

    println!("Microsoft Translator key: {}", describe(translator));
    println!("Google TTS key:           {}", describe(tts));

    if translator.is_none() || tts.is_none() {
        anyhow::bail!("Credentials are not fully configured");
    }

    Ok(())
}
