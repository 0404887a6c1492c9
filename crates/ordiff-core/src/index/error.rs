use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors that abort an indexing run.
///
/// Failures scoped to a single release pair or record are logged and the run
/// continues; only these reach the caller.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to fetch releases for {owner}/{repo}: {source}")]
    FetchReleases {
        owner: String,
        repo: String,
        #[source]
        source: RemoteError,
    },

    #[error("Release cache unavailable: {0}")]
    Store(#[from] StoreError),
}
