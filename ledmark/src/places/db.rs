use std::collections::HashMap;
use std::path::Path;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use shared::protocol::{MENU_ROOT_ID, TYPE_BOOKMARK, TYPE_FOLDER};
use shared::types::{BookmarkEntry, FolderRecord};
use crate::error::BookmarkError;

/// Outcome of removing ledger entries from the store
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub removed: Vec<i64>,
    pub skipped: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

/// Transactional writer over a places.sqlite bookmark store
pub struct PlacesStore {
    conn: Connection,
    /// Folder ids resolved during this run, keyed by title
    folders: HashMap<String, i64>,
}

impl PlacesStore {
    /// Open an existing places database
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BookmarkError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;

        if !has_places_schema(&conn)? {
            return Err(BookmarkError::NotPlacesDatabase(path.to_path_buf()));
        }

        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            folders: HashMap::new(),
        }
    }

    /// Find a folder with exactly this title directly under the menu root
    pub fn find_folder(&self, title: &str) -> Result<Option<FolderRecord>, BookmarkError> {
        let folder = self
            .conn
            .query_row(
                "SELECT id, title, parent FROM moz_bookmarks
                 WHERE type = ?1 AND title = ?2 AND parent = ?3
                 ORDER BY id LIMIT 1",
                params![TYPE_FOLDER, title, MENU_ROOT_ID],
                |row| {
                    Ok(FolderRecord {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        parent_id: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(folder)
    }

    /// Look up the target folder by title, creating it at the end of the
    /// menu root when absent. Later calls with the same title do no writes.
    pub fn resolve_or_create_folder(&mut self, title: &str) -> Result<i64, BookmarkError> {
        if let Some(&id) = self.folders.get(title) {
            return Ok(id);
        }

        let id = match self.find_folder(title)? {
            Some(folder) => folder.id,
            None => {
                let tx = self.conn.transaction()?;
                let position = next_position(&tx, MENU_ROOT_ID)?;
                let now = now_micros();

                tx.execute(
                    "INSERT INTO moz_bookmarks (type, fk, parent, position, title, dateAdded, lastModified)
                     VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6)",
                    params![TYPE_FOLDER, MENU_ROOT_ID, position, title, now, now],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;

                tracing::info!(title, id, "Created bookmark folder");
                id
            }
        };

        self.folders.insert(title.to_string(), id);
        Ok(id)
    }

    /// Insert a bookmark for `url` at the end of `parent_id`.
    ///
    /// The url row is reused when it exists. Everything runs in one
    /// transaction; any error drops it uncommitted, which rolls back.
    pub fn add_bookmark(
        &mut self,
        title: &str,
        url: &str,
        parent_id: i64,
    ) -> Result<BookmarkEntry, BookmarkError> {
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row("SELECT id FROM moz_places WHERE url = ?1", params![url], |row| row.get(0))
            .optional()?;

        let place_id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO moz_places (url, title, rev_host) VALUES (?1, ?2, ?3)",
                    params![url, title, rev_host(url)],
                )?;
                tx.last_insert_rowid()
            }
        };

        let position = next_position(&tx, parent_id)?;
        let now = now_micros();

        tx.execute(
            "INSERT INTO moz_bookmarks (type, fk, parent, position, title, dateAdded, lastModified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![TYPE_BOOKMARK, place_id, parent_id, position, title, now, now],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(BookmarkEntry {
            id,
            title: title.to_string(),
            url: url.to_string(),
            parent_id,
            position,
            date_added: now,
            last_modified: now,
        })
    }

    /// Remove every ledger entry still present in the store.
    /// Url rows are left alone. A failed entry does not stop the others.
    pub fn restore(&mut self, entries: &[BookmarkEntry]) -> RestoreReport {
        let mut report = RestoreReport::default();

        for entry in entries {
            match self.remove_bookmark(entry) {
                Ok(true) => {
                    tracing::info!(title = %entry.title, url = %entry.url, "Removed bookmark");
                    report.removed.push(entry.id);
                }
                Ok(false) => {
                    tracing::warn!(title = %entry.title, id = entry.id, "Bookmark no longer present, skipping");
                    report.skipped.push(entry.id);
                }
                Err(e) => {
                    tracing::error!(title = %entry.title, id = entry.id, "Failed to remove bookmark: {}", e);
                    report.failed.push((entry.id, e.to_string()));
                }
            }
        }

        report
    }

    /// Delete one bookmark row and close the gap in its parent's positions.
    /// The row must still point at the recorded url.
    fn remove_bookmark(&mut self, entry: &BookmarkEntry) -> Result<bool, BookmarkError> {
        let tx = self.conn.transaction()?;

        let located: Option<(i64, i64)> = tx
            .query_row(
                "SELECT b.parent, b.position FROM moz_bookmarks b
                 JOIN moz_places p ON p.id = b.fk
                 WHERE b.id = ?1 AND b.type = ?2 AND p.url = ?3",
                params![entry.id, TYPE_BOOKMARK, entry.url],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((parent, position)) = located else {
            return Ok(false);
        };

        tx.execute("DELETE FROM moz_bookmarks WHERE id = ?1", params![entry.id])?;
        tx.execute(
            "UPDATE moz_bookmarks SET position = position - 1 WHERE parent = ?1 AND position > ?2",
            params![parent, position],
        )?;
        tx.commit()?;

        Ok(true)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn has_places_schema(conn: &Connection) -> Result<bool, BookmarkError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master
         WHERE type = 'table' AND name IN ('moz_places', 'moz_bookmarks')",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 2)
}

/// One past the highest sibling position, 0 for an empty parent
fn next_position(conn: &Connection, parent_id: i64) -> rusqlite::Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(position) FROM moz_bookmarks WHERE parent = ?1",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(max.map_or(0, |p| p + 1))
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// moz_places.rev_host value: the url without its scheme, lowercased
fn rev_host(url: &str) -> String {
    url.rsplit("://").next().unwrap_or(url).to_lowercase()
}

/// Minimal places schema with the menu root, for tests
#[cfg(test)]
pub(crate) fn create_test_schema(conn: &Connection) {
    conn.execute_batch(
        r#"
        CREATE TABLE moz_places (
            id       INTEGER PRIMARY KEY,
            url      LONGVARCHAR UNIQUE,
            title    LONGVARCHAR,
            rev_host LONGVARCHAR
        );

        CREATE TABLE moz_bookmarks (
            id           INTEGER PRIMARY KEY,
            type         INTEGER,
            fk           INTEGER DEFAULT NULL,
            parent       INTEGER,
            position     INTEGER,
            title        LONGVARCHAR,
            dateAdded    INTEGER,
            lastModified INTEGER
        );

        INSERT INTO moz_bookmarks (id, type, fk, parent, position, title, dateAdded, lastModified)
        VALUES (1, 2, NULL, 0, 0, 'menu', 0, 0);
        "#,
    )
    .unwrap();
}

#[cfg(test)]
pub(crate) fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}
