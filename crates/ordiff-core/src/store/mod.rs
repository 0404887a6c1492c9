//! Durable storage for releases, commits and per-pair file changes.
//!
//! Releases and commits are upserted by identity (last write wins). File
//! changes are append-only; whether a release pair has been indexed is
//! answered by [`DeltaStore::has_file_changes_cached`].

mod error;
mod sqlite;

pub use error::StoreError;
pub use sqlite::SqliteStore;

use crate::models::{Commit, FileChange, Release};

/// Trait for delta record storage backends.
///
/// Every call is independently committed. Implementations must tolerate
/// concurrent readers while an indexing run is writing.
pub trait DeltaStore: Send + Sync {
    /// Upserts a release by `(owner, repo, tag_name)`.
    fn save_release(&self, release: &Release) -> Result<(), StoreError>;

    /// Upserts a commit by `(owner, repo, sha)`.
    fn save_commit(&self, commit: &Commit) -> Result<(), StoreError>;

    /// Appends a file change row. No uniqueness is enforced.
    fn save_file_change(&self, change: &FileChange) -> Result<(), StoreError>;

    /// Loads a single release.
    fn get_release(&self, owner: &str, repo: &str, tag: &str) -> Result<Release, StoreError>;

    /// Lists releases of a repository, newest first.
    fn get_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, StoreError>;

    /// Lists commits authored between the publish times of two releases
    /// (inclusive), oldest first.
    ///
    /// Selection is by timestamp window, not commit-graph ancestry.
    fn get_commits_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<Commit>, StoreError>;

    /// Lists file changes stored for the exact release pair.
    fn get_file_changes(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<FileChange>, StoreError>;

    /// Whether at least one file change exists for the exact release pair.
    fn has_file_changes_cached(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<bool, StoreError>;

    /// Total file change rows for a repository. A progress hint only.
    fn count_cached_pairs(&self, owner: &str, repo: &str) -> Result<u64, StoreError>;

    /// Number of distinct pull requests referenced by commits in the same
    /// window as [`DeltaStore::get_commits_between`].
    fn pr_count_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<u64, StoreError>;
}
