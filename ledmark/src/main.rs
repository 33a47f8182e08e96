mod app;
mod cli;
mod config;
mod error;
mod export;
mod mdns;
mod places;
mod profile;

use std::path::PathBuf;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::cli::Cli;
use crate::config::Config;
use crate::mdns::browser::MdnsBrowser;
use crate::mdns::engine::DiscoveryEngine;
use crate::places::backup;
use crate::places::db::PlacesStore;
use crate::places::ledger::Ledger;
use crate::profile::ExternalPicker;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose { "ledmark=debug" } else { "ledmark=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter))
        )
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        None => Config::default(),
    };
    cli.apply(&mut config);

    // Locate and back up the bookmark store before anything touches it
    let db_path = match &cli.profile_path {
        Some(path) => path.clone(),
        None => {
            let root = search_root(&config)?;
            let picker = ExternalPicker::new(config.bookmarks.picker.clone());
            profile::locate_places_db(&root, &config.bookmarks.excluded_path_keywords, &picker)?
        }
    };

    backup::ensure_backup(&db_path)
        .with_context(|| format!("Failed to back up {}", db_path.display()))?;

    let mut store = PlacesStore::open(&db_path)
        .with_context(|| format!("Failed to open bookmark store {}", db_path.display()))?;
    tracing::info!("Opened bookmark store at {}", db_path.display());

    if cli.restore {
        let report = app::restore(&mut store, &config.bookmarks.ledger_path)?;
        tracing::info!(
            removed = report.removed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Restore complete"
        );
        return Ok(());
    }

    // Create cancellation token; ctrl-c ends discovery early
    let cancel = CancellationToken::new();
    let watcher_cancel = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            watcher_cancel.cancel();
        }
    });

    let browser = MdnsBrowser::new()?;
    let engine = DiscoveryEngine::new(browser);
    let discovered = app::discover(&engine, &config.discovery, cancel).await;
    watcher.abort();
    tracing::debug!(state = ?engine.state(), "Discovery engine stopped");

    // Shutdown mDNS daemon
    if let Err(e) = engine.backend().shutdown() {
        tracing::error!("Failed to shutdown mDNS daemon: {}", e);
    }

    let records = discovered?;
    if records.is_empty() {
        tracing::info!("No services of type {} found", config.discovery.service_type);
        return Ok(());
    }

    let json = crate::export::render(&records)?;
    println!("{}", json);

    let output = &config.discovery.output;
    match crate::export::export(&records, output) {
        Ok(()) => tracing::info!("Discovered services saved to {}", output.display()),
        Err(e) => tracing::error!("Failed to save discovered services: {:#}", e),
    }

    let mut ledger = Ledger::load_or_new(&config.bookmarks.ledger_path)
        .context("Failed to load bookmark ledger")?;
    let summary = app::persist(&mut store, &mut ledger, &config.bookmarks.folder_title, &records)?;

    tracing::info!(
        folder = %config.bookmarks.folder_title,
        folder_id = summary.folder_id,
        added = summary.added.len(),
        failed = summary.failed.len(),
        unrecorded = summary.unrecorded.len(),
        "Bookmarking complete"
    );
    for title in &summary.failed {
        tracing::warn!(title = %title, "Not bookmarked");
    }
    for title in &summary.unrecorded {
        tracing::warn!(title = %title, "Bookmarked but not in ledger; restore will not remove it");
    }

    app::check_persisted(&summary)
}

fn search_root(config: &Config) -> Result<PathBuf> {
    match &config.bookmarks.search_root {
        Some(root) => Ok(root.clone()),
        None => dirs::home_dir().context("Failed to determine home directory"),
    }
}
