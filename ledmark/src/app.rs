use std::path::Path;
use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use shared::types::{BookmarkEntry, ServiceRecord};
use crate::config::DiscoveryConfig;
use crate::error::DiscoveryError;
use crate::mdns::engine::{window, DiscoveryBackend, DiscoveryEngine};
use crate::places::db::{PlacesStore, RestoreReport};
use crate::places::ledger::Ledger;

/// Per-record results of a persist pass
#[derive(Debug, Default)]
pub struct PersistSummary {
    pub folder_id: i64,
    pub added: Vec<BookmarkEntry>,
    pub failed: Vec<String>,
    /// Added to the store but missing from the saved ledger, so restore
    /// will not remove them
    pub unrecorded: Vec<String>,
}

/// Run one discovery window. A lost subscription still yields whatever
/// was collected, as long as something was.
pub async fn discover<B: DiscoveryBackend>(
    engine: &DiscoveryEngine<B>,
    config: &DiscoveryConfig,
    cancel: CancellationToken,
) -> Result<Vec<ServiceRecord>> {
    let duration = window(config.duration_secs);

    match engine.run(&config.service_type, duration, cancel).await {
        Ok(records) => Ok(records),
        Err(DiscoveryError::SubscriptionLost { reason, snapshot }) if !snapshot.is_empty() => {
            tracing::warn!(%reason, count = snapshot.len(), "Discovery ended early, keeping partial results");
            Ok(snapshot)
        }
        Err(e) => Err(e).context("Discovery failed"),
    }
}

/// Bookmark every record under `folder_title`, recording each success in
/// the ledger. Folder resolution failure aborts; a failed record does not.
pub fn persist(
    store: &mut PlacesStore,
    ledger: &mut Ledger,
    folder_title: &str,
    records: &[ServiceRecord],
) -> Result<PersistSummary> {
    let folder_id = store
        .resolve_or_create_folder(folder_title)
        .with_context(|| format!("Failed to resolve bookmark folder '{}'", folder_title))?;

    let mut summary = PersistSummary {
        folder_id,
        ..Default::default()
    };

    for record in records {
        let title = record.instance_label();
        let url = record.url();

        match store.add_bookmark(title, &url, folder_id) {
            Ok(entry) => {
                tracing::info!(title, %url, position = entry.position, "Bookmark added");
                ledger.record(entry.clone());
                if let Err(e) = ledger.save() {
                    tracing::error!(title, "Bookmark added but not recorded in {}: {}", ledger.path().display(), e);
                    summary.unrecorded.push(title.to_string());
                }
                summary.added.push(entry);
            }
            Err(e) => {
                tracing::error!(title, %url, "Failed to add bookmark: {}", e);
                summary.failed.push(title.to_string());
            }
        }
    }

    Ok(summary)
}

/// Remove the bookmarks listed in the ledger at `ledger_path`.
/// Without a ledger there is nothing known to be ours, so nothing is touched.
pub fn restore(store: &mut PlacesStore, ledger_path: &Path) -> Result<RestoreReport> {
    let Some(mut ledger) = Ledger::load(ledger_path)? else {
        tracing::info!("No ledger at {}, nothing to restore", ledger_path.display());
        return Ok(RestoreReport::default());
    };

    let report = store.restore(ledger.entries());

    let settled: Vec<i64> = report.removed.iter().chain(&report.skipped).copied().collect();
    ledger.forget(&settled);
    ledger
        .save()
        .with_context(|| format!("Failed to update ledger {}", ledger_path.display()))?;

    Ok(report)
}

/// Fail the run when nothing at all could be persisted
pub fn check_persisted(summary: &PersistSummary) -> Result<()> {
    if summary.added.is_empty() && !summary.failed.is_empty() {
        bail!("None of {} bookmarks could be added", summary.failed.len());
    }
    Ok(())
}
