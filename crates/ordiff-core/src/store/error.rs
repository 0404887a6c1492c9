use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the delta record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite query or connection error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Release not found: {owner}/{repo}@{tag}")]
    ReleaseNotFound {
        owner: String,
        repo: String,
        tag: String,
    },

    /// The database is not usable (e.g. WAL could not be enabled).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn release_not_found(owner: &str, repo: &str, tag: &str) -> Self {
        StoreError::ReleaseNotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
            tag: tag.to_string(),
        }
    }
}
