//! Human-readable and JSON rendering for CLI commands.

use serde_json::{json, Value};

use ordiff_core::models::short_sha;
use ordiff_core::{CompareReport, IndexOutcome, Release};

/// Files shown in the human compare report.
const TOP_FILES: usize = 10;

/// Commits shown in the human compare report.
const RECENT_COMMITS: usize = 5;

/// Longest commit message shown before truncation.
const MAX_MESSAGE_CHARS: usize = 60;

pub fn print_releases(owner: &str, repo: &str, releases: &[Release]) {
    if releases.is_empty() {
        println!("No releases cached for {}/{}.", owner, repo);
        return;
    }

    println!("Releases for {}/{}:\n", owner, repo);
    for release in releases {
        println!(
            "  {:<20}  {}",
            release.tag_name,
            release.published_at.format("%Y-%m-%d")
        );
    }
}

pub fn print_outcome(outcome: &IndexOutcome) {
    println!("{}", outcome.summary());
    if outcome.failed > 0 {
        println!(
            "  {} release pair(s) failed and will be retried on the next run",
            outcome.failed
        );
    }
    if outcome.unresolved > 0 {
        println!(
            "  {} release pair(s) skipped: release has no commit",
            outcome.unresolved
        );
    }
    println!("Run 'ordiff list' to see releases.");
}

pub fn print_compare(report: &CompareReport) {
    println!(
        "\n=== {} → {} ===\n",
        report.from_release.tag_name, report.to_release.tag_name
    );
    println!(
        "Commits: {} | PRs: {} | Files Changed: {}\n",
        report.commits.len(),
        report.pr_count,
        report.files.len()
    );

    if !report.files.is_empty() {
        println!("Top Changed Files:");
        println!("  +Add  -Del  File");
        println!("  ---- ----  ----");
        for file in report.top_files(TOP_FILES) {
            println!(
                "  {:+4} {:<4}  {}",
                file.additions, file.deletions, file.filename
            );
        }
        println!();
    }

    println!("Recent Commits:");
    for commit in report.commits.iter().take(RECENT_COMMITS) {
        println!("  {}  {}", short_sha(&commit.sha), truncate(commit.subject()));
    }
    if report.commits.len() > RECENT_COMMITS {
        println!(
            "  ... and {} more commits",
            report.commits.len() - RECENT_COMMITS
        );
    }
}

/// JSON rendering of a comparison for `compare --json`.
pub fn compare_json(report: &CompareReport) -> Value {
    json!({
        "from_release": report.from_release.tag_name,
        "to_release": report.to_release.tag_name,
        "commit_count": report.commits.len(),
        "pr_count": report.pr_count,
        "files_changed": report.files.len(),
        "commits": report.commits,
        "files": report.files,
    })
}

/// Shortens a message to [`MAX_MESSAGE_CHARS`], ending in `...` when cut.
fn truncate(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_CHARS {
        return message.to_string();
    }
    let kept: String = message.chars().take(MAX_MESSAGE_CHARS - 3).collect();
    format!("{kept}...")
}
