pub mod compare;
pub mod config;
pub mod index;
pub mod models;
pub mod remote;
pub mod run_state;
pub mod service;
pub mod store;

pub use compare::{compare, CompareError, CompareReport, SummaryData};
pub use config::{Config, ConfigError, RepoSettings};
pub use index::{IndexError, IndexOutcome, IndexProgress, Indexer, ProgressFn, ReleasePair};
pub use models::{Commit, FileChange, FileStatus, Release};
pub use remote::{GitHubClient, Page, RemoteError, RemoteSource};
pub use run_state::{RunStatus, RunTracker, StartError};
pub use service::IndexService;
pub use store::{DeltaStore, SqliteStore, StoreError};
