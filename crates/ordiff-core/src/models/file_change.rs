use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file changed between two releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    /// Any other status reported by the remote (`copied`, `changed`, ...).
    Other(String),
}

impl FileStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Removed => "removed",
            Self::Renamed => "renamed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for FileStatus {
    fn from(s: &str) -> Self {
        match s {
            "added" => Self::Added,
            "modified" => Self::Modified,
            "removed" => Self::Removed,
            "renamed" => Self::Renamed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FileStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<FileStatus> for String {
    fn from(status: FileStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed file between two consecutive releases.
///
/// The store does not enforce uniqueness on these rows; the pair key
/// `(from_release, to_release)` is stamped by the indexer just before saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub owner: String,
    pub repo: String,
    /// Tag of the older release of the pair.
    pub from_release: String,
    /// Tag of the newer release of the pair.
    pub to_release: String,
    pub filename: String,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    pub status: FileStatus,
    /// Unified diff. Absent for binary or very large files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl FileChange {
    /// Creates an unstamped file change with zero line counts.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        filename: impl Into<String>,
        status: impl Into<FileStatus>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            from_release: String::new(),
            to_release: String::new(),
            filename: filename.into(),
            additions: 0,
            deletions: 0,
            changes: 0,
            status: status.into(),
            patch: None,
        }
    }

    /// Sets the line counts.
    pub fn with_lines(mut self, additions: u32, deletions: u32, changes: u32) -> Self {
        self.additions = additions;
        self.deletions = deletions;
        self.changes = changes;
        self
    }

    /// Sets the unified diff body.
    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patch = Some(patch.into());
        self
    }

    /// Stamps the release pair this change belongs to.
    pub fn for_pair(
        mut self,
        from_release: impl Into<String>,
        to_release: impl Into<String>,
    ) -> Self {
        self.from_release = from_release.into();
        self.to_release = to_release.into();
        self
    }
}
