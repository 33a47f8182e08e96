use std::path::{Path, PathBuf};
use shared::protocol::BACKUP_FILE_NAME;
use crate::error::BookmarkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Conventional backup location: places_backup.sqlite next to the store
pub fn backup_path(db_path: &Path) -> PathBuf {
    db_path.with_file_name(BACKUP_FILE_NAME)
}

/// Copy the store to its backup path unless a backup is already there.
/// An existing backup is the oldest known-good copy and is never replaced.
pub fn ensure_backup(db_path: impl AsRef<Path>) -> Result<BackupOutcome, BookmarkError> {
    let db_path = db_path.as_ref();
    let backup = backup_path(db_path);

    if backup.exists() {
        tracing::info!("Backup already exists at {}", backup.display());
        return Ok(BackupOutcome::AlreadyExists(backup));
    }

    // Copy under a temporary name so an interrupted copy never occupies
    // the backup path
    let tmp = crate::export::temp_path(&backup);
    if let Err(e) = std::fs::copy(db_path, &tmp) {
        let _ = std::fs::remove_file(&tmp);
        return Err(BookmarkError::io(&tmp, e));
    }
    if let Err(e) = std::fs::rename(&tmp, &backup) {
        let _ = std::fs::remove_file(&tmp);
        return Err(BookmarkError::io(&backup, e));
    }
    tracing::info!("Backup created at {}", backup.display());

    Ok(BackupOutcome::Created(backup))
}
