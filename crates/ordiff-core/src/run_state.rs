//! Single-flight guard and status mailbox for background indexing runs.
//!
//! One [`RunTracker`] exists per process. A run is accepted through
//! [`RunTracker::try_start`]; while it is active, any other start request
//! is rejected and the running status is left untouched. Pollers read
//! consistent snapshots through [`RunTracker::status`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PROGRESS_TOTAL;

/// Snapshot of the current or most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "is_running")]
    pub running: bool,
    pub progress: u32,
    pub total: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            running: false,
            progress: 0,
            total: PROGRESS_TOTAL,
            message: String::new(),
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Rejection of a start request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("Indexing already in progress for {owner}/{repo}")]
    AlreadyRunning { owner: String, repo: String },
}

/// Tracks the single in-flight indexing run.
#[derive(Debug, Default)]
pub struct RunTracker {
    status: RwLock<RunStatus>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run for `owner/repo` as started, unless one is already running.
    pub fn try_start(&self, owner: &str, repo: &str) -> Result<(), StartError> {
        let mut status = self.status.write();
        if status.running {
            return Err(StartError::AlreadyRunning {
                owner: status.owner.clone(),
                repo: status.repo.clone(),
            });
        }

        *status = RunStatus {
            owner: owner.to_string(),
            repo: repo.to_string(),
            running: true,
            message: format!("Starting indexing for {owner}/{repo}"),
            started_at: Some(Utc::now()),
            ..RunStatus::default()
        };
        Ok(())
    }

    /// Records progress of the active run.
    ///
    /// Ignored when no run is active. Progress never moves backwards within
    /// a run and is capped at `total`.
    pub fn update_progress(&self, current: u32, total: u32, message: impl Into<String>) {
        let mut status = self.status.write();
        if !status.running {
            return;
        }
        status.total = total;
        status.progress = current.max(status.progress).min(total);
        status.message = message.into();
    }

    /// Ends the active run. A failed finish records `message` as the error.
    pub fn finish(&self, success: bool, message: impl Into<String>) {
        let message = message.into();
        let mut status = self.status.write();
        status.running = false;
        status.finished_at = Some(Utc::now());
        if success {
            status.progress = status.total;
            status.error = None;
        } else {
            status.error = Some(message.clone());
        }
        status.message = message;
    }

    /// Ends the active run with an error.
    pub fn set_error(&self, message: impl Into<String>) {
        self.finish(false, message);
    }

    /// Returns a copy of the current status.
    pub fn status(&self) -> RunStatus {
        self.status.read().clone()
    }

    /// Whether a run is active.
    pub fn is_running(&self) -> bool {
        self.status.read().running
    }

    /// Whether no run has ever been started.
    pub fn is_idle(&self) -> bool {
        self.status.read().started_at.is_none()
    }
}
