use std::ffi::OsString;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::Serialize;
use shared::types::ServiceRecord;

#[derive(Serialize)]
struct ExportDocument<'a> {
    discovered_services: &'a [ServiceRecord],
}

/// Pretty-printed JSON document for a snapshot
pub fn render(records: &[ServiceRecord]) -> Result<String> {
    serde_json::to_string_pretty(&ExportDocument { discovered_services: records })
        .context("Failed to serialize discovered services")
}

/// Write the snapshot to `path` via a temporary sibling and a rename,
/// so a failed write never leaves a truncated document behind.
pub fn export(records: &[ServiceRecord], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = render(records)?;

    let tmp = temp_path(path);
    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.display()))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to move export into place at {}", path.display()));
    }

    Ok(())
}

pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
