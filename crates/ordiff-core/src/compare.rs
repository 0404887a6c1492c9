//! Release-to-release comparison over cached records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{short_sha, Commit, FileChange, Release};
use crate::store::{DeltaStore, StoreError};

/// Files listed in a [`SummaryData`].
pub const SUMMARY_MAX_FILES: usize = 10;

/// Commits listed in a [`SummaryData`].
pub const SUMMARY_MAX_COMMITS: usize = 20;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Release {tag} not found for {owner}/{repo}. Run 'ordiff index {owner} {repo}' first.")]
    ReleaseNotFound { owner: String, repo: String, tag: String },

    #[error("Comparison query failed: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CompareError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ReleaseNotFound { owner, repo, tag } => {
                Self::ReleaseNotFound { owner, repo, tag }
            }
            other => Self::Store(other),
        }
    }
}

/// Everything cached about the gap between two releases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub from_release: Release,
    pub to_release: Release,
    /// Commits in the publish-time window, oldest first.
    pub commits: Vec<Commit>,
    pub files: Vec<FileChange>,
    pub pr_count: u64,
}

/// Loads the comparison between `from` and `to` from the cache.
pub fn compare(
    store: &dyn DeltaStore,
    owner: &str,
    repo: &str,
    from: &str,
    to: &str,
) -> Result<CompareReport, CompareError> {
    let from_release = store.get_release(owner, repo, from)?;
    let to_release = store.get_release(owner, repo, to)?;
    let commits = store.get_commits_between(owner, repo, from, to)?;
    let files = store.get_file_changes(owner, repo, from, to)?;
    let pr_count = store.pr_count_between(owner, repo, from, to)?;

    Ok(CompareReport {
        from_release,
        to_release,
        commits,
        files,
        pr_count,
    })
}

impl CompareReport {
    /// The `n` files with the most changed lines.
    pub fn top_files(&self, n: usize) -> Vec<&FileChange> {
        let mut files: Vec<_> = self.files.iter().collect();
        files.sort_by(|a, b| b.changes.cmp(&a.changes));
        files.truncate(n);
        files
    }

    /// Condensed view for reporting and summarisation.
    pub fn summary(&self) -> SummaryData {
        SummaryData {
            from_release: self.from_release.tag_name.clone(),
            to_release: self.to_release.tag_name.clone(),
            commit_count: self.commits.len(),
            pr_count: self.pr_count,
            files_changed: self.files.len(),
            top_files: self
                .top_files(SUMMARY_MAX_FILES)
                .into_iter()
                .map(FileSummary::from)
                .collect(),
            commits: self
                .commits
                .iter()
                .take(SUMMARY_MAX_COMMITS)
                .map(CommitSummary::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryData {
    pub from_release: String,
    pub to_release: String,
    pub commit_count: usize,
    pub pr_count: u64,
    pub files_changed: usize,
    pub top_files: Vec<FileSummary>,
    pub commits: Vec<CommitSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    pub status: String,
}

impl From<&FileChange> for FileSummary {
    fn from(f: &FileChange) -> Self {
        Self {
            name: f.filename.clone(),
            additions: f.additions,
            deletions: f.deletions,
            changes: f.changes,
            status: f.status.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u32>,
}

impl From<&Commit> for CommitSummary {
    fn from(c: &Commit) -> Self {
        Self {
            sha: short_sha(&c.sha).to_string(),
            message: c.message.clone(),
            author: c.author.clone(),
            date: c.date.format("%Y-%m-%d").to_string(),
            pr_number: c.pr_number,
        }
    }
}
