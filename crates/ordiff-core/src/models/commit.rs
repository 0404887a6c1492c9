use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Literal markers that introduce a pull request number in a commit message,
/// in the order they are tried.
pub const PR_PREFIXES: &[&str] = &["#", "PR #", "pull/"];

/// A commit that landed between two releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub owner: String,
    pub repo: String,
    /// Content-addressed commit identifier.
    pub sha: String,
    pub message: String,
    pub author: String,
    pub author_email: String,
    /// Authored timestamp.
    pub date: DateTime<Utc>,
    /// Canonical web URL of the commit.
    pub url: String,
    /// Pull request number referenced by the message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u32>,
}

impl Commit {
    /// Creates a commit, extracting the pull request number from `message`.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        sha: impl Into<String>,
        message: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let message = message.into();
        let pr_number = extract_pr_number(&message);

        Self {
            owner: owner.into(),
            repo: repo.into(),
            sha: sha.into(),
            message,
            author: String::new(),
            author_email: String::new(),
            date,
            url: String::new(),
            pr_number,
        }
    }

    /// Sets the author name and email.
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author = name.into();
        self.author_email = email.into();
        self
    }

    /// Sets the canonical URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Extracts a pull request number from a commit message.
///
/// Each prefix in [`PR_PREFIXES`] is tried in turn against its first
/// occurrence in the message. Digits following the prefix are collected,
/// skipping anything before the first digit; the first prefix that yields
/// digits wins. The number is not checked against the remote.
pub fn extract_pr_number(message: &str) -> Option<u32> {
    PR_PREFIXES.iter().find_map(|prefix| {
        let idx = message.find(prefix)?;
        leading_number(&message[idx + prefix.len()..])
    })
}

fn leading_number(rest: &str) -> Option<u32> {
    let digits: String = rest
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
