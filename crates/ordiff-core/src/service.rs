//! Background indexing on top of [`Indexer`] and [`RunTracker`].

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::index::{IndexError, IndexOutcome, IndexProgress, Indexer, ProgressFn};
use crate::run_state::{RunStatus, RunTracker, StartError};

/// Called with the outcome of every successful run.
pub type CompletionHook = dyn Fn(&IndexOutcome) + Send + Sync;

/// Starts indexing runs, foreground or in the background, and exposes
/// their status.
#[derive(Clone)]
pub struct IndexService {
    indexer: Arc<Indexer>,
    tracker: Arc<RunTracker>,
    on_complete: Option<Arc<CompletionHook>>,
}

impl IndexService {
    pub fn new(indexer: Arc<Indexer>, tracker: Arc<RunTracker>) -> Self {
        Self {
            indexer,
            tracker,
            on_complete: None,
        }
    }

    /// Sets the hook run after each successful indexing run.
    pub fn with_completion_hook(
        mut self,
        hook: impl Fn(&IndexOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    /// Runs indexing to completion in the caller's task.
    ///
    /// The tracker is not touched; progress goes to `progress` only.
    pub async fn run_indexing(
        &self,
        owner: &str,
        repo: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<IndexOutcome, IndexError> {
        let outcome = self.indexer.index(owner, repo, progress).await?;
        self.complete(&outcome);
        Ok(outcome)
    }

    /// Starts a background run for `owner/repo`.
    ///
    /// Returns immediately. Rejected without side effects while another run
    /// is active. Must be called from within a Tokio runtime.
    ///
    /// A run that panics is recorded as failed, so the tracker never stays
    /// stuck in the running state.
    pub fn start_indexing(&self, owner: &str, repo: &str) -> Result<JoinHandle<()>, StartError> {
        self.tracker.try_start(owner, repo)?;
        info!(owner, repo, "Background indexing started");

        let service = self.clone();
        let owner = owner.to_string();
        let repo = repo.to_string();
        Ok(tokio::spawn(async move {
            let run = {
                let service = service.clone();
                let (owner, repo) = (owner.clone(), repo.clone());
                tokio::spawn(async move { service.run_tracked(&owner, &repo).await })
            };

            if let Err(e) = run.await {
                error!(
                    owner = %owner,
                    repo = %repo,
                    error = %e,
                    "Background indexing task aborted"
                );
                if service.tracker.is_running() {
                    service
                        .tracker
                        .set_error(format!("Failed to index {owner}/{repo}: {e}"));
                }
            }
        }))
    }

    /// Latest status snapshot.
    pub fn poll_status(&self) -> RunStatus {
        self.tracker.status()
    }

    async fn run_tracked(&self, owner: &str, repo: &str) {
        let tracker = Arc::clone(&self.tracker);
        let sink: &ProgressFn =
            &move |p: IndexProgress| tracker.update_progress(p.current, p.total, p.message);

        match self.indexer.index(owner, repo, Some(sink)).await {
            Ok(outcome) => {
                // The run stays active until the hook has returned.
                self.complete(&outcome);
                self.tracker.finish(true, outcome.summary());
            }
            Err(e) => {
                error!(owner, repo, error = %e, "Background indexing failed");
                self.tracker.set_error(format!("Failed to index {owner}/{repo}: {e}"));
            }
        }
    }

    fn complete(&self, outcome: &IndexOutcome) {
        if let Some(hook) = &self.on_complete {
            hook(outcome);
        }
    }
}
