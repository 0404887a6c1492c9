//! Default values for ordiff configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// GitHub Defaults
// ============================================================================

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Items requested per page (GitHub maximum).
pub const DEFAULT_PER_PAGE: u32 = 100;

/// User-Agent header sent with every request. GitHub rejects requests without one.
pub const DEFAULT_USER_AGENT: &str = concat!("ordiff/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// GitHub API version header value.
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

// ============================================================================
// Storage Defaults
// ============================================================================

/// Default SQLite cache location.
pub const DEFAULT_DB_PATH: &str = "ordiff.db";

/// Default file holding the persisted default repository.
pub const DEFAULT_SETTINGS_FILE: &str = ".ordiff.yaml";

/// How long SQLite waits on a locked database before failing, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// Index Defaults
// ============================================================================

/// Total of the progress scale reported by an indexing run.
pub const PROGRESS_TOTAL: u32 = 100;

/// End of the release-fetch band (0 .. this).
pub const DEFAULT_FETCH_BAND_END: u32 = 20;

/// End of the release-persist band. Pair processing takes the rest.
pub const DEFAULT_PERSIST_BAND_END: u32 = 30;

// ============================================================================
// Serve Defaults
// ============================================================================

/// Default port for `ordiff serve`.
pub const DEFAULT_SERVE_PORT: u16 = 4747;
