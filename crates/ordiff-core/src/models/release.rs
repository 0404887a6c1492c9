use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A published release of a repository.
///
/// Releases are immutable once fetched; writing the same
/// `(owner, repo, tag_name)` again replaces the stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Tag the release was published from.
    pub tag_name: String,
    /// Display name, often equal to the tag.
    pub name: String,
    /// When the release was published.
    pub published_at: DateTime<Utc>,
    /// Commit the tag points at. Empty when the remote could not resolve it.
    pub commit_sha: String,
    /// Free-text release notes.
    pub body: String,
}

impl Release {
    /// Creates a release with no name, body or commit pointer.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        tag_name: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            tag_name: tag_name.into(),
            name: String::new(),
            published_at,
            commit_sha: String::new(),
            body: String::new(),
        }
    }

    /// Sets the commit the tag points at.
    pub fn with_commit(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = sha.into();
        self
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the release notes.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether the release carries a commit pointer usable for comparisons.
    pub fn has_commit(&self) -> bool {
        !self.commit_sha.trim().is_empty()
    }
}

/// Sorts releases by publish time, newest first.
///
/// The sort is stable, so releases published at the same instant keep the
/// order the remote returned them in.
pub fn sort_newest_first(releases: &mut [Release]) {
    releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}
