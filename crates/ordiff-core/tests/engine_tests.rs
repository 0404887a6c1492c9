mod common;

use std::sync::{Arc, Mutex};

use common::*;
use ordiff_core::{DeltaStore, IndexError, IndexProgress, Indexer, ProgressFn, RemoteError};

fn indexer(remote: &Arc<FakeRemote>, store: &Arc<ordiff_core::SqliteStore>) -> Indexer {
    Indexer::new(remote.clone(), store.clone())
}

#[tokio::test]
async fn test_first_run_indexes_pair() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(two_release_remote());

    let outcome = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.releases, 2);
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.pairs(), 1);

    assert_eq!(store.get_releases(OWNER, REPO).unwrap().len(), 2);
    assert_eq!(store.get_commits_between(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap().len(), 3);
    let files = store.get_file_changes(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.from_release == "v1.0.0" && f.to_release == "v1.1.0"));
    assert_eq!(store.pr_count_between(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap(), 2);
}

#[tokio::test]
async fn test_second_run_skips_cached_pair() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(two_release_remote());
    let indexer = indexer(&remote, &store);

    indexer.index(OWNER, REPO, None).await.unwrap();
    let compare_calls = FakeRemote::calls(&remote.compare_calls);
    let diff_calls = FakeRemote::calls(&remote.diff_calls);

    let outcome = indexer.index(OWNER, REPO, None).await.unwrap();
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.summary(), "Indexed acme/widget - 0 new, 1 already cached");

    // Only the release listing is fetched again.
    assert_eq!(FakeRemote::calls(&remote.compare_calls), compare_calls);
    assert_eq!(FakeRemote::calls(&remote.diff_calls), diff_calls);
    assert_eq!(FakeRemote::calls(&remote.release_calls), 2);
    assert_eq!(store.get_file_changes(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap().len(), 2);
}

#[tokio::test]
async fn test_new_release_only_fetches_new_pair() {
    let (store, _dir) = temp_store();
    let first = Arc::new(two_release_remote());
    indexer(&first, &store).index(OWNER, REPO, None).await.unwrap();

    let second = Arc::new(
        two_release_remote()
            .with_release(release("v1.2.0", 20, "ccc"))
            .with_range(
                "bbb",
                "ccc",
                vec![commit("c4", "Next", 15)],
                vec![file("src/new.rs", 5, 0)],
            ),
    );
    let outcome = indexer(&second, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(second.compared(), vec![("bbb".to_string(), "ccc".to_string())]);
    assert!(store.has_file_changes_cached(OWNER, REPO, "v1.1.0", "v1.2.0").unwrap());
}

#[tokio::test]
async fn test_pairs_walked_newest_first_regardless_of_remote_order() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(
        FakeRemote::new()
            .with_release(release("v1", 1, "s1"))
            .with_release(release("v3", 3, "s3"))
            .with_release(release("v2", 2, "s2"))
            .with_range("s1", "s2", vec![], vec![file("a", 1, 0)])
            .with_range("s2", "s3", vec![], vec![file("b", 1, 0)]),
    );

    let outcome = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.processed, 2);
    assert_eq!(
        remote.compared(),
        vec![
            ("s2".to_string(), "s3".to_string()),
            ("s1".to_string(), "s2".to_string()),
        ]
    );
    assert!(store.has_file_changes_cached(OWNER, REPO, "v2", "v3").unwrap());
    assert!(store.has_file_changes_cached(OWNER, REPO, "v1", "v2").unwrap());
    assert!(!store.has_file_changes_cached(OWNER, REPO, "v1", "v3").unwrap());
}

#[tokio::test]
async fn test_missing_commit_pointer_is_unresolved() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(
        FakeRemote::new()
            .with_release(release("v2", 2, ""))
            .with_release(release("v1", 1, "s1")),
    );

    let outcome = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.unresolved, 1);
    assert_eq!(FakeRemote::calls(&remote.compare_calls), 0);
    assert_eq!(FakeRemote::calls(&remote.diff_calls), 0);
    assert_eq!(store.get_releases(OWNER, REPO).unwrap().len(), 2);
}

#[tokio::test]
async fn test_commit_failure_does_not_abort_run() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(
        FakeRemote::new()
            .with_release(release("v3", 3, "s3"))
            .with_release(release("v2", 2, "s2"))
            .with_release(release("v1", 1, "s1"))
            .with_range("s1", "s2", vec![commit("c1", "fix", 2)], vec![file("a", 1, 0)])
            .failing_commits("s2", "s3"),
    );

    let outcome = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.processed, 1);
    // The diff is never requested for the failed pair.
    assert_eq!(FakeRemote::calls(&remote.diff_calls), 1);
    assert!(!store.has_file_changes_cached(OWNER, REPO, "v2", "v3").unwrap());
    assert!(store.has_file_changes_cached(OWNER, REPO, "v1", "v2").unwrap());
}

#[tokio::test]
async fn test_diff_failure_keeps_commits_and_retries_pair() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(two_release_remote().failing_diff("aaa", "bbb"));
    let indexer = indexer(&remote, &store);

    let outcome = indexer.index(OWNER, REPO, None).await.unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.processed, 0);
    assert_eq!(store.get_commits_between(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap().len(), 3);
    assert!(!store.has_file_changes_cached(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap());

    let outcome = indexer.index(OWNER, REPO, None).await.unwrap();
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(FakeRemote::calls(&remote.diff_calls), 2);
}

#[tokio::test]
async fn test_release_listing_failure_is_fatal() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(FakeRemote::new().failing_releases());

    let err = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap_err();

    match err {
        IndexError::FetchReleases { owner, repo, source } => {
            assert_eq!((owner.as_str(), repo.as_str()), (OWNER, REPO));
            assert!(matches!(source, RemoteError::Api { status: 404, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.get_releases(OWNER, REPO).unwrap().is_empty());
}

#[tokio::test]
async fn test_fewer_than_two_releases() {
    let (store, _dir) = temp_store();

    let empty = Arc::new(FakeRemote::new());
    let outcome = indexer(&empty, &store).index(OWNER, REPO, None).await.unwrap();
    assert_eq!(outcome.releases, 0);
    assert_eq!(outcome.pairs(), 0);

    let single = Arc::new(FakeRemote::new().with_release(release("v1", 1, "s1")));
    let outcome = indexer(&single, &store).index(OWNER, REPO, None).await.unwrap();
    assert_eq!(outcome.releases, 1);
    assert_eq!(outcome.pairs(), 0);
    assert_eq!(FakeRemote::calls(&single.compare_calls), 0);
}

#[tokio::test]
async fn test_follows_pagination() {
    let (store, _dir) = temp_store();
    let mut remote = FakeRemote::new().with_release_page_size(2).with_commit_page_size(2);
    for day in (1..=5).rev() {
        remote = remote.with_release(release(&format!("v{day}"), day, &format!("s{day}")));
    }
    let remote = Arc::new(remote.with_range(
        "s4",
        "s5",
        vec![commit("c1", "one", 4), commit("c2", "two", 4), commit("c3", "three", 5)],
        vec![file("a", 1, 0)],
    ));

    let outcome = indexer(&remote, &store).index(OWNER, REPO, None).await.unwrap();

    assert_eq!(outcome.releases, 5);
    assert_eq!(outcome.pairs(), 4);
    assert_eq!(FakeRemote::calls(&remote.release_calls), 3);
    // Two pages for the populated range, one for each of the other three.
    assert_eq!(FakeRemote::calls(&remote.compare_calls), 5);
    assert_eq!(store.get_commits_between(OWNER, REPO, "v4", "v5").unwrap().len(), 3);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let (store, _dir) = temp_store();
    let mut remote = FakeRemote::new().with_release_page_size(3);
    for day in (1..=8).rev() {
        let sha = format!("s{day}");
        remote = remote.with_release(release(&format!("v{day}"), day, &sha));
    }
    let remote = Arc::new(remote);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: &ProgressFn = &move |p: IndexProgress| {
        assert!(p.current <= p.total);
        sink_seen.lock().unwrap().push(p.current);
    };

    indexer(&remote, &store).index(OWNER, REPO, Some(sink)).await.unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.len() > 8);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
}

/// Six releases with one changed file per consecutive pair.
fn six_release_remote() -> FakeRemote {
    let mut remote = FakeRemote::new();
    for day in (1..=6).rev() {
        remote = remote.with_release(release(&format!("v{day}"), day, &format!("s{day}")));
    }
    for day in 2..=6 {
        let (from, to) = (format!("s{}", day - 1), format!("s{day}"));
        remote = remote.with_range(&from, &to, vec![], vec![file("src/lib.rs", 1, 0)]);
    }
    remote
}

/// Runs the indexer and returns the updates emitted between the start of
/// the pair phase and the final summary.
async fn pair_updates(indexer: &Indexer) -> Vec<IndexProgress> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: &ProgressFn = &move |p: IndexProgress| sink_seen.lock().unwrap().push(p);

    indexer.index(OWNER, REPO, Some(sink)).await.unwrap();

    let seen = seen.lock().unwrap();
    let start = seen
        .iter()
        .position(|p| p.message.starts_with("Processing 5 release pairs"))
        .unwrap();
    seen[start + 1..seen.len() - 1].to_vec()
}

#[tokio::test]
async fn test_progress_reported_after_every_pair() {
    let (store, _dir) = temp_store();
    let remote = Arc::new(six_release_remote());
    let indexer = indexer(&remote, &store);

    let first = pair_updates(&indexer).await;
    assert_eq!(first.len(), 5, "{first:?}");
    assert!(first.iter().all(|p| p.message.starts_with("Processed")), "{first:?}");
    assert!(first.windows(2).all(|w| w[0].current < w[1].current), "{first:?}");

    // A resumed run over a fully cached history still reports each pair.
    let resumed = pair_updates(&indexer).await;
    let messages: Vec<_> = resumed.iter().map(|p| p.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Skipping v5 -> v6 (already cached)",
            "Skipping v4 -> v5 (already cached)",
            "Skipping v3 -> v4 (already cached)",
            "Skipping v2 -> v3 (already cached)",
            "Skipping v1 -> v2 (already cached)",
        ]
    );
    assert!(resumed.iter().all(|p| p.current >= 30 && p.current < 100));
}

#[tokio::test]
async fn test_cache_count_failure_is_fatal_before_remote_calls() {
    let (sqlite, _dir) = temp_store();
    let store = Arc::new(FlakyStore::new(sqlite).failing_count());
    let remote = Arc::new(two_release_remote());

    let err = Indexer::new(remote.clone(), store)
        .index(OWNER, REPO, None)
        .await
        .unwrap_err();

    assert!(matches!(err, IndexError::Store(_)), "{err}");
    assert_eq!(FakeRemote::calls(&remote.release_calls), 0);
}

#[tokio::test]
async fn test_record_save_failures_do_not_abort_pair() {
    let (sqlite, _dir) = temp_store();
    let store = Arc::new(
        FlakyStore::new(sqlite.clone())
            .failing_release_saves()
            .failing_commit_saves(),
    );
    let remote = Arc::new(two_release_remote());

    let outcome = Indexer::new(remote.clone(), store.clone())
        .index(OWNER, REPO, None)
        .await
        .unwrap();

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.failed, 0);
    // Every commit was attempted and the diff was still fetched and stored.
    assert_eq!(FakeRemote::calls(&store.commit_save_attempts), 3);
    assert_eq!(FakeRemote::calls(&remote.diff_calls), 1);
    assert!(sqlite.get_releases(OWNER, REPO).unwrap().is_empty());
    assert!(sqlite.has_file_changes_cached(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap());
}

#[tokio::test]
async fn test_failed_cache_lookup_reprocesses_pair() {
    let (sqlite, _dir) = temp_store();
    let store = Arc::new(FlakyStore::new(sqlite.clone()).failing_lookup());
    let remote = Arc::new(two_release_remote());
    let indexer = Indexer::new(remote.clone(), store);

    indexer.index(OWNER, REPO, None).await.unwrap();
    let outcome = indexer.index(OWNER, REPO, None).await.unwrap();

    // The pair is cached, but the lookup cannot say so.
    assert!(sqlite.has_file_changes_cached(OWNER, REPO, "v1.0.0", "v1.1.0").unwrap());
    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(FakeRemote::calls(&remote.diff_calls), 2);
}
