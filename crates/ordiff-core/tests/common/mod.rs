#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use ordiff_core::{
    Commit, DeltaStore, FileChange, Page, Release, RemoteError, RemoteSource, SqliteStore,
    StoreError,
};

pub const OWNER: &str = "acme";
pub const REPO: &str = "widget";

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn release(tag: &str, day: u32, sha: &str) -> Release {
    Release::new(OWNER, REPO, tag, at(day, 12)).with_commit(sha)
}

pub fn commit(sha: &str, message: &str, day: u32) -> Commit {
    Commit::new(OWNER, REPO, sha, message, at(day, 9)).with_author("Dev", "dev@example.com")
}

pub fn file(name: &str, additions: u32, deletions: u32) -> FileChange {
    FileChange::new(OWNER, REPO, name, "modified").with_lines(
        additions,
        deletions,
        additions + deletions,
    )
}

pub fn temp_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("ordiff.db")).unwrap();
    (Arc::new(store), dir)
}

type Range = (String, String);

fn range(from: &str, to: &str) -> Range {
    (from.to_string(), to.to_string())
}

/// In-memory [`RemoteSource`] with call counters and failure injection.
#[derive(Default)]
pub struct FakeRemote {
    releases: Vec<Release>,
    release_page_size: Option<usize>,
    commit_page_size: Option<usize>,
    commits: HashMap<Range, Vec<Commit>>,
    files: HashMap<Range, Vec<FileChange>>,
    fail_releases: bool,
    fail_commits: HashSet<Range>,
    fail_diff: HashSet<Range>,
    delay: Option<Duration>,
    pub release_calls: AtomicUsize,
    pub compare_calls: AtomicUsize,
    pub diff_calls: AtomicUsize,
    compared: Mutex<Vec<Range>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.releases.push(release);
        self
    }

    pub fn with_range(
        mut self,
        from: &str,
        to: &str,
        commits: Vec<Commit>,
        files: Vec<FileChange>,
    ) -> Self {
        self.commits.insert(range(from, to), commits);
        self.files.insert(range(from, to), files);
        self
    }

    pub fn with_release_page_size(mut self, size: usize) -> Self {
        self.release_page_size = Some(size);
        self
    }

    pub fn with_commit_page_size(mut self, size: usize) -> Self {
        self.commit_page_size = Some(size);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_releases(mut self) -> Self {
        self.fail_releases = true;
        self
    }

    pub fn failing_commits(mut self, from: &str, to: &str) -> Self {
        self.fail_commits.insert(range(from, to));
        self
    }

    pub fn failing_diff(mut self, from: &str, to: &str) -> Self {
        self.fail_diff.insert(range(from, to));
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Commit ranges compared so far, in call order (first page only).
    pub fn compared(&self) -> Vec<Range> {
        self.compared.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: u32, size: Option<usize>) -> Page<T> {
    let Some(size) = size else {
        return Page::last(items.to_vec());
    };
    let pages = items.len().div_ceil(size).max(1) as u32;
    let start = (page as usize - 1) * size;
    let chunk = items.iter().skip(start).take(size).cloned().collect();
    Page {
        items: chunk,
        next_page: (page < pages).then_some(page + 1),
        last_page: (page < pages).then_some(pages),
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn list_releases(
        &self,
        _owner: &str,
        _repo: &str,
        page: u32,
    ) -> Result<Page<Release>, RemoteError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_releases {
            return Err(RemoteError::Api {
                status: 404,
                message: "Not Found".to_string(),
            });
        }
        Ok(paginate(&self.releases, page, self.release_page_size))
    }

    async fn compare_range(
        &self,
        _owner: &str,
        _repo: &str,
        from_commit: &str,
        to_commit: &str,
        page: u32,
    ) -> Result<Page<Commit>, RemoteError> {
        self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let key = range(from_commit, to_commit);
        if page == 1 {
            self.compared.lock().unwrap().push(key.clone());
        }
        if self.fail_commits.contains(&key) {
            return Err(RemoteError::Network("connection reset".to_string()));
        }
        let commits = self.commits.get(&key).cloned().unwrap_or_default();
        Ok(paginate(&commits, page, self.commit_page_size))
    }

    async fn diff_range(
        &self,
        _owner: &str,
        _repo: &str,
        from_commit: &str,
        to_commit: &str,
    ) -> Result<Vec<FileChange>, RemoteError> {
        self.diff_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let key = range(from_commit, to_commit);
        if self.fail_diff.contains(&key) {
            return Err(RemoteError::RateLimited { reset_at: None });
        }
        Ok(self.files.get(&key).cloned().unwrap_or_default())
    }
}

/// Two releases, three commits between them (two referencing PRs) and two
/// changed files.
pub fn two_release_remote() -> FakeRemote {
    FakeRemote::new()
        .with_release(release("v1.1.0", 10, "bbb"))
        .with_release(release("v1.0.0", 1, "aaa"))
        .with_range(
            "aaa",
            "bbb",
            vec![
                commit("c1", "Add feature (#12)", 2),
                commit("c2", "Merge pull request #13 from fork", 3),
                commit("c3", "Tidy up", 4),
            ],
            vec![file("src/lib.rs", 10, 2), file("README.md", 1, 1)],
        )
}

/// [`DeltaStore`] over a real [`SqliteStore`] with failure injection.
pub struct FlakyStore {
    inner: Arc<SqliteStore>,
    fail_count: bool,
    fail_lookup: bool,
    fail_release_saves: bool,
    fail_commit_saves: bool,
    pub commit_save_attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            fail_count: false,
            fail_lookup: false,
            fail_release_saves: false,
            fail_commit_saves: false,
            commit_save_attempts: AtomicUsize::new(0),
        }
    }

    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    pub fn failing_lookup(mut self) -> Self {
        self.fail_lookup = true;
        self
    }

    pub fn failing_release_saves(mut self) -> Self {
        self.fail_release_saves = true;
        self
    }

    pub fn failing_commit_saves(mut self) -> Self {
        self.fail_commit_saves = true;
        self
    }
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("disk I/O error".to_string())
}

impl DeltaStore for FlakyStore {
    fn save_release(&self, release: &Release) -> Result<(), StoreError> {
        if self.fail_release_saves {
            return Err(unavailable());
        }
        self.inner.save_release(release)
    }

    fn save_commit(&self, commit: &Commit) -> Result<(), StoreError> {
        self.commit_save_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit_saves {
            return Err(unavailable());
        }
        self.inner.save_commit(commit)
    }

    fn save_file_change(&self, change: &FileChange) -> Result<(), StoreError> {
        self.inner.save_file_change(change)
    }

    fn get_release(&self, owner: &str, repo: &str, tag: &str) -> Result<Release, StoreError> {
        self.inner.get_release(owner, repo, tag)
    }

    fn get_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, StoreError> {
        self.inner.get_releases(owner, repo)
    }

    fn get_commits_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<Commit>, StoreError> {
        self.inner.get_commits_between(owner, repo, from_tag, to_tag)
    }

    fn get_file_changes(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<FileChange>, StoreError> {
        self.inner.get_file_changes(owner, repo, from_tag, to_tag)
    }

    fn has_file_changes_cached(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<bool, StoreError> {
        if self.fail_lookup {
            return Err(unavailable());
        }
        self.inner.has_file_changes_cached(owner, repo, from_tag, to_tag)
    }

    fn count_cached_pairs(&self, owner: &str, repo: &str) -> Result<u64, StoreError> {
        if self.fail_count {
            return Err(unavailable());
        }
        self.inner.count_cached_pairs(owner, repo)
    }

    fn pr_count_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<u64, StoreError> {
        self.inner.pr_count_between(owner, repo, from_tag, to_tag)
    }
}
