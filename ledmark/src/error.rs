use std::path::PathBuf;
use thiserror::Error;
use shared::types::ServiceRecord;

/// Errors raised by a discovery run
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The browse subscription could not be started
    #[error("Failed to subscribe to '{service_type}': {reason}")]
    Subscribe { service_type: String, reason: String },

    /// The event stream ended before the run was over.
    /// Records collected up to that point are carried along.
    #[error("Discovery subscription lost: {reason}")]
    SubscriptionLost {
        reason: String,
        snapshot: Vec<ServiceRecord>,
    },

    #[error("Discovery backend error: {0}")]
    Backend(String),
}

/// Errors raised by the bookmark store, its backup and its ledger
#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file opened fine but lacks the places schema
    #[error("{} is not a places database", .0.display())]
    NotPlacesDatabase(PathBuf),
}

impl BookmarkError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}
