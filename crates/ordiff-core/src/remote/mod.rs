//! Read access to a remote release history.
//!
//! [`RemoteSource`] is the seam the indexing engine fetches through;
//! [`GitHubClient`] implements it against the GitHub REST API.

mod error;
mod github;

pub use error::RemoteError;
pub use github::GitHubClient;

use async_trait::async_trait;

use crate::models::{Commit, FileChange, Release};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Page to request next. `None` ends the listing.
    pub next_page: Option<u32>,
    /// Last page of the listing, when the remote reports it.
    pub last_page: Option<u32>,
}

impl<T> Page<T> {
    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page: None,
            last_page: None,
        }
    }
}

/// Paginated read access to releases and to the commits and file diff
/// between two points in history.
///
/// Pages are numbered from 1.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Lists one page of releases.
    async fn list_releases(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> Result<Page<Release>, RemoteError>;

    /// Lists one page of commits reachable from `to_commit` but not from `from_commit`.
    async fn compare_range(
        &self,
        owner: &str,
        repo: &str,
        from_commit: &str,
        to_commit: &str,
        page: u32,
    ) -> Result<Page<Commit>, RemoteError>;

    /// Lists the files changed between two commits. The result is not paginated.
    async fn diff_range(
        &self,
        owner: &str,
        repo: &str,
        from_commit: &str,
        to_commit: &str,
    ) -> Result<Vec<FileChange>, RemoteError>;
}
