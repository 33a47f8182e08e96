use std::path::{Path, PathBuf};
use shared::types::BookmarkEntry;
use crate::error::BookmarkError;
use crate::export::temp_path;

/// Append-only record of bookmarks this tool created, kept as a JSON array
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: Vec<BookmarkEntry>,
}

impl Ledger {
    /// Load an existing ledger. Returns None when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, BookmarkError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| BookmarkError::io(path, e))?;
        let entries = serde_json::from_str(&contents).map_err(|e| BookmarkError::json(path, e))?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            entries,
        }))
    }

    /// Load the ledger, or start an empty one if none exists yet
    pub fn load_or_new(path: impl AsRef<Path>) -> Result<Self, BookmarkError> {
        let path = path.as_ref();
        Ok(Self::load(path)?.unwrap_or_else(|| Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[BookmarkEntry] {
        &self.entries
    }

    pub fn record(&mut self, entry: BookmarkEntry) {
        self.entries.push(entry);
    }

    /// Drop every entry whose bookmark id is in `ids`
    pub fn forget(&mut self, ids: &[i64]) {
        self.entries.retain(|e| !ids.contains(&e.id));
    }

    pub fn save(&self) -> Result<(), BookmarkError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| BookmarkError::json(&self.path, e))?;

        let tmp = temp_path(&self.path);
        std::fs::write(&tmp, json).map_err(|e| BookmarkError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| BookmarkError::io(&self.path, e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> BookmarkEntry {
        BookmarkEntry {
            id,
            title: format!("wled-{id}"),
            url: format!("http://192.168.1.{id}/"),
            parent_id: 7,
            position: id - 1,
            date_added: 1_700_000_000_000_000,
            last_modified: 1_700_000_000_000_000,
        }
    }

    #[test]
    fn test_missing_ledger_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Ledger::load(dir.path().join("bookmarks_added.json")).unwrap().is_none());
    }

    #[test]
    fn test_record_save_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks_added.json");

        let mut ledger = Ledger::load_or_new(&path).unwrap();
        ledger.record(entry(1));
        ledger.record(entry(2));
        ledger.save().unwrap();

        let mut reloaded = Ledger::load(&path).unwrap().unwrap();
        assert_eq!(reloaded.entries(), &[entry(1), entry(2)]);

        reloaded.forget(&[1]);
        reloaded.save().unwrap();
        assert_eq!(Ledger::load(&path).unwrap().unwrap().entries(), &[entry(2)]);
    }

    #[test]
    fn test_corrupt_ledger_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks_added.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(Ledger::load(&path).unwrap_err(), BookmarkError::Json { .. }));
    }
}
