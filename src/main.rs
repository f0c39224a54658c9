use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use dealwatch::config::{Config, ConfigError};
use dealwatch::feed::FeedFetcher;
use dealwatch::notify::WebhookNotifier;
use dealwatch::poller::{FixedDelay, Poller, TokioClock};
use dealwatch::storage::SeenStore;

#[derive(Parser, Debug)]
#[command(name = "dealwatch", about = "Post new deals from a feed to a Discord webhook")]
struct Args {
    /// TOML config file
    #[arg(long, value_name = "FILE", default_value = "dealwatch.toml")]
    config: PathBuf,

    /// Seen-store SQLite file (overrides config and environment)
    #[arg(long, value_name = "PATH")]
    db: Option<String>,

    /// Feed address (overrides config and environment)
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,
}

fn load_config(args: &Args) -> Result<dealwatch::config::Settings, ConfigError> {
    let mut config = Config::load(&args.config)?;
    config.apply_env();
    if let Some(db) = &args.db {
        config.db_path = Some(db.clone());
    }
    if let Some(feed_url) = &args.feed_url {
        config.feed_url = Some(feed_url.clone());
    }
    config.into_settings()
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Optional; real environment variables take precedence over the file
    let dotenv_path = dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Some(path) = &dotenv_path {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let args = Args::parse();

    let settings = match load_config(&args) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Set db_path, webhook_url and feed_url in {}", args.config.display());
            eprintln!("or via DEALWATCH_DB_PATH, DEALWATCH_WEBHOOK_URL and DEALWATCH_FEED_URL");
            eprintln!("(SQLITE_DB_FILE, DISCORD_WEBHOOK and OZBARGIN_RSS_FEED are also read, including from .env).");
            std::process::exit(1);
        }
    };

    let store = SeenStore::open(&settings.db_path)
        .await
        .with_context(|| format!("Failed to open seen store at {}", settings.db_path))?;
    let known = store.count().await.context("Failed to read seen store")?;
    tracing::info!(path = %settings.db_path, known, "Seen store opened");

    let client = reqwest::Client::builder()
        .user_agent(concat!("dealwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let fetcher = FeedFetcher::new(client.clone(), &settings.feed_url, settings.fetch_timeout);
    let notifier = WebhookNotifier::new(client, settings.webhook_url, &settings.avatar_url);

    let mut poller = Poller::new(
        fetcher,
        store,
        notifier,
        TokioClock,
        FixedDelay::unbounded(settings.notify_retry_delay),
        settings.poll,
    );

    tokio::select! {
        _ = poller.run() => {},
        _ = shutdown_signal() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
