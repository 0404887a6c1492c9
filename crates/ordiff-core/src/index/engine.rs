use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::IndexError;
use super::plan::{release_pairs, ProgressPlan, ReleasePair};
use crate::config::IndexConfig;
use crate::models::{sort_newest_first, Commit, Release};
use crate::remote::{RemoteError, RemoteSource};
use crate::store::DeltaStore;

/// A progress update emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexProgress {
    pub current: u32,
    pub total: u32,
    pub message: String,
}

/// Progress sink passed to [`Indexer::index`].
pub type ProgressFn = dyn Fn(IndexProgress) + Send + Sync;

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOutcome {
    pub owner: String,
    pub repo: String,
    /// Releases fetched from the remote.
    pub releases: usize,
    /// Pairs whose commits and file diff were fetched in this run.
    pub processed: usize,
    /// Pairs already present in the cache.
    pub skipped: usize,
    /// Pairs abandoned after a remote error.
    pub failed: usize,
    /// Pairs where a release had no commit pointer.
    pub unresolved: usize,
}

impl IndexOutcome {
    fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            ..Default::default()
        }
    }

    /// Number of consecutive release pairs considered.
    pub fn pairs(&self) -> usize {
        self.processed + self.skipped + self.failed + self.unresolved
    }

    /// One-line summary, e.g. `Indexed ollama/ollama - 3 new, 12 already cached`.
    pub fn summary(&self) -> String {
        format!(
            "Indexed {}/{} - {} new, {} already cached",
            self.owner, self.repo, self.processed, self.skipped
        )
    }
}

/// Result of visiting one pair.
enum PairResult {
    Skipped,
    Processed,
    Failed,
    Unresolved,
}

impl PairResult {
    fn describe(&self, pair: &ReleasePair, outcome: &IndexOutcome) -> String {
        let (from, to) = (pair.from_tag(), pair.to_tag());
        match self {
            PairResult::Skipped => format!("Skipping {from} -> {to} (already cached)"),
            PairResult::Processed => format!(
                "Processed {from} -> {to} ({} processed, {} skipped)",
                outcome.processed, outcome.skipped
            ),
            PairResult::Failed => format!("Failed {from} -> {to}, will retry next run"),
            PairResult::Unresolved => format!("Skipping {from} -> {to} (no commit pointer)"),
        }
    }
}

/// Emits progress through an optional sink.
struct Reporter<'a> {
    sink: Option<&'a ProgressFn>,
    total: u32,
}

impl Reporter<'_> {
    fn emit(&self, current: u32, message: impl Into<String>) {
        if let Some(sink) = self.sink {
            sink(IndexProgress {
                current,
                total: self.total,
                message: message.into(),
            });
        }
    }
}

/// Incrementally indexes the release history of a repository.
///
/// Releases are fetched and upserted, then every consecutive pair is walked
/// newest first. A pair with any cached file change is skipped; otherwise
/// its commits and file diff are fetched and stored. Errors scoped to a pair
/// or a record are logged and the run continues.
pub struct Indexer {
    remote: Arc<dyn RemoteSource>,
    store: Arc<dyn DeltaStore>,
    plan: ProgressPlan,
}

impl Indexer {
    /// Creates an indexer with the default progress bands.
    pub fn new(remote: Arc<dyn RemoteSource>, store: Arc<dyn DeltaStore>) -> Self {
        Self {
            remote,
            store,
            plan: ProgressPlan::default(),
        }
    }

    /// Sets progress bands from configuration.
    pub fn with_config(mut self, config: &IndexConfig) -> Self {
        self.plan = ProgressPlan::from_config(config);
        self
    }

    /// The store this indexer writes to.
    pub fn store(&self) -> &Arc<dyn DeltaStore> {
        &self.store
    }

    /// Runs a full indexing pass over `owner/repo`.
    ///
    /// Fails only when the cache is unreachable or the release listing
    /// cannot be fetched.
    pub async fn index(
        &self,
        owner: &str,
        repo: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<IndexOutcome, IndexError> {
        let report = Reporter {
            sink: progress,
            total: self.plan.total(),
        };
        let mut outcome = IndexOutcome::new(owner, repo);

        let cached_rows = self.store.count_cached_pairs(owner, repo)?;
        info!(owner, repo, cached_rows, "Starting indexing run");

        report.emit(0, format!("Fetching releases for {owner}/{repo}"));
        let mut releases = self
            .fetch_releases(owner, repo, &report)
            .await
            .map_err(|source| IndexError::FetchReleases {
                owner: owner.to_string(),
                repo: repo.to_string(),
                source,
            })?;
        sort_newest_first(&mut releases);
        outcome.releases = releases.len();
        info!(owner, repo, releases = releases.len(), "Fetched releases");

        self.persist_releases(&releases, &report);

        let pairs = release_pairs(&releases);
        let total_pairs = pairs.len();
        report.emit(
            self.plan.pairs_start(),
            format!("Processing {total_pairs} release pairs ({cached_rows} cached file changes)"),
        );

        for pair in &pairs {
            let result = if self.is_cached(owner, repo, pair) {
                debug!(from = pair.from_tag(), to = pair.to_tag(), "Pair already cached");
                PairResult::Skipped
            } else {
                self.index_pair(owner, repo, pair).await
            };

            match result {
                PairResult::Skipped => outcome.skipped += 1,
                PairResult::Processed => outcome.processed += 1,
                PairResult::Failed => outcome.failed += 1,
                PairResult::Unresolved => outcome.unresolved += 1,
            }

            // One update per pair, cached or not.
            report.emit(
                self.plan.pair(outcome.processed, outcome.skipped, total_pairs),
                result.describe(pair, &outcome),
            );
        }

        report.emit(self.plan.total(), outcome.summary());
        info!(
            owner,
            repo,
            processed = outcome.processed,
            skipped = outcome.skipped,
            failed = outcome.failed,
            unresolved = outcome.unresolved,
            "Indexing run finished"
        );

        Ok(outcome)
    }

    async fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        report: &Reporter<'_>,
    ) -> Result<Vec<Release>, RemoteError> {
        let mut releases = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self.remote.list_releases(owner, repo, page_number).await?;
            releases.extend(page.items);
            // The final page carries no `last` link.
            let last_page = page
                .last_page
                .or(page.next_page.is_none().then_some(page_number));
            report.emit(
                self.plan.fetch(page_number, last_page),
                format!("Fetched {} releases", releases.len()),
            );

            match page.next_page {
                Some(next) if next > page_number => page_number = next,
                _ => break,
            }
        }

        Ok(releases)
    }

    fn persist_releases(&self, releases: &[Release], report: &Reporter<'_>) {
        for (i, release) in releases.iter().enumerate() {
            if let Err(e) = self.store.save_release(release) {
                warn!(tag = %release.tag_name, error = %e, "Failed to save release");
            }
            report.emit(
                self.plan.persist(i + 1, releases.len()),
                format!("Saved release {}", release.tag_name),
            );
        }
    }

    fn is_cached(&self, owner: &str, repo: &str, pair: &ReleasePair) -> bool {
        match self
            .store
            .has_file_changes_cached(owner, repo, pair.from_tag(), pair.to_tag())
        {
            Ok(cached) => cached,
            Err(e) => {
                warn!(
                    from = pair.from_tag(),
                    to = pair.to_tag(),
                    error = %e,
                    "Cache lookup failed, reindexing pair"
                );
                false
            }
        }
    }

    async fn index_pair(&self, owner: &str, repo: &str, pair: &ReleasePair) -> PairResult {
        if !pair.is_resolvable() {
            warn!(
                from = pair.from_tag(),
                to = pair.to_tag(),
                "Release has no commit pointer, skipping pair"
            );
            return PairResult::Unresolved;
        }

        let from_commit = pair.older.commit_sha.as_str();
        let to_commit = pair.newer.commit_sha.as_str();

        let commits = match self.fetch_commits(owner, repo, from_commit, to_commit).await {
            Ok(commits) => commits,
            Err(e) => {
                warn!(
                    from = pair.from_tag(),
                    to = pair.to_tag(),
                    error = %e,
                    "Failed to fetch commits"
                );
                return PairResult::Failed;
            }
        };
        for commit in &commits {
            if let Err(e) = self.store.save_commit(commit) {
                warn!(sha = %commit.sha, error = %e, "Failed to save commit");
            }
        }

        let files = match self.remote.diff_range(owner, repo, from_commit, to_commit).await {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    from = pair.from_tag(),
                    to = pair.to_tag(),
                    error = %e,
                    "Failed to fetch file diff"
                );
                return PairResult::Failed;
            }
        };
        let file_count = files.len();
        for change in files {
            let change = change.for_pair(pair.from_tag(), pair.to_tag());
            if let Err(e) = self.store.save_file_change(&change) {
                warn!(file = %change.filename, error = %e, "Failed to save file change");
            }
        }

        debug!(
            from = pair.from_tag(),
            to = pair.to_tag(),
            commits = commits.len(),
            files = file_count,
            "Indexed pair"
        );
        PairResult::Processed
    }

    async fn fetch_commits(
        &self,
        owner: &str,
        repo: &str,
        from_commit: &str,
        to_commit: &str,
    ) -> Result<Vec<Commit>, RemoteError> {
        let mut commits = Vec::new();
        let mut page_number = 1;

        loop {
            let page = self
                .remote
                .compare_range(owner, repo, from_commit, to_commit, page_number)
                .await?;
            commits.extend(page.items);

            match page.next_page {
                Some(next) if next > page_number => page_number = next,
                _ => break,
            }
        }

        Ok(commits)
    }
}
