//! Records mirrored from the remote release history.
//!
//! - [`Release`] - a published tag, identified by `(owner, repo, tag_name)`
//! - [`Commit`] - a commit between two releases, identified by `(owner, repo, sha)`
//! - [`FileChange`] - one changed file between two consecutive releases

mod commit;
mod file_change;
mod release;

pub use commit::{extract_pr_number, Commit, PR_PREFIXES};
pub use file_change::{FileChange, FileStatus};
pub use release::{sort_newest_first, Release};

/// Length of an abbreviated commit SHA in human output.
pub const SHORT_SHA_LEN: usize = 7;

/// Abbreviates a commit SHA to [`SHORT_SHA_LEN`] characters.
pub fn short_sha(sha: &str) -> &str {
    match sha.char_indices().nth(SHORT_SHA_LEN) {
        Some((idx, _)) => &sha[..idx],
        None => sha,
    }
}
