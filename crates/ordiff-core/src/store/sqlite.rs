//! SQLite backend for the delta record store.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::error::StoreError;
use super::DeltaStore;
use crate::config::DEFAULT_BUSY_TIMEOUT_MS;
use crate::models::{Commit, FileChange, Release};

/// Idempotent schema. Timestamps are RFC 3339 UTC text with a `Z` suffix so
/// that string comparison in SQL is chronological.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS releases (
    owner        TEXT NOT NULL,
    repo         TEXT NOT NULL,
    tag_name     TEXT NOT NULL,
    name         TEXT NOT NULL DEFAULT '',
    published_at TEXT NOT NULL,
    commit_sha   TEXT NOT NULL DEFAULT '',
    body         TEXT NOT NULL DEFAULT '',
    PRIMARY KEY (owner, repo, tag_name)
);

CREATE TABLE IF NOT EXISTS commits (
    owner        TEXT NOT NULL,
    repo         TEXT NOT NULL,
    sha          TEXT NOT NULL,
    message      TEXT NOT NULL DEFAULT '',
    author       TEXT NOT NULL DEFAULT '',
    author_email TEXT NOT NULL DEFAULT '',
    date         TEXT NOT NULL,
    url          TEXT NOT NULL DEFAULT '',
    pr_number    INTEGER,
    PRIMARY KEY (owner, repo, sha)
);

CREATE TABLE IF NOT EXISTS file_changes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    owner        TEXT NOT NULL,
    repo         TEXT NOT NULL,
    from_release TEXT NOT NULL,
    to_release   TEXT NOT NULL,
    filename     TEXT NOT NULL,
    additions    INTEGER NOT NULL DEFAULT 0,
    deletions    INTEGER NOT NULL DEFAULT 0,
    changes      INTEGER NOT NULL DEFAULT 0,
    status       TEXT NOT NULL,
    patch        TEXT
);

CREATE INDEX IF NOT EXISTS idx_releases_published ON releases (owner, repo, published_at);
CREATE INDEX IF NOT EXISTS idx_commits_date ON commits (owner, repo, date);
CREATE INDEX IF NOT EXISTS idx_file_changes_pair
    ON file_changes (owner, repo, from_release, to_release);
"#;

/// Commits whose authored date falls inside the publish window of two releases.
const COMMITS_IN_WINDOW: &str = r#"
FROM commits c
JOIN releases r1
  ON r1.owner = c.owner AND r1.repo = c.repo AND r1.tag_name = ?3
JOIN releases r2
  ON r2.owner = c.owner AND r2.repo = c.repo AND r2.tag_name = ?4
WHERE c.owner = ?1 AND c.repo = ?2
  AND c.date >= r1.published_at
  AND c.date <= r2.published_at
"#;

/// SQLite-backed delta record store.
///
/// A single connection is shared behind a mutex. Each operation holds the
/// lock for one statement only, so readers interleave with a running index.
/// The database runs in WAL mode so other processes can read concurrently.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates a store at `path`, creating the schema if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let conn = Connection::open(path)?;

        let journal_mode: String =
            conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        if !journal_mode.eq_ignore_ascii_case("wal") {
            return Err(StoreError::Unavailable(format!(
                "could not enable WAL mode at {} (got '{}')",
                path.display(),
                journal_mode
            )));
        }

        debug!(path = %path.display(), "opened release cache");
        Self::init(conn)
    }

    /// Creates a private in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl DeltaStore for SqliteStore {
    fn save_release(&self, release: &Release) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO releases
                (owner, repo, tag_name, name, published_at, commit_sha, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                release.owner,
                release.repo,
                release.tag_name,
                release.name,
                encode_time(&release.published_at),
                release.commit_sha,
                release.body,
            ],
        )?;
        Ok(())
    }

    fn save_commit(&self, commit: &Commit) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO commits
                (owner, repo, sha, message, author, author_email, date, url, pr_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                commit.owner,
                commit.repo,
                commit.sha,
                commit.message,
                commit.author,
                commit.author_email,
                encode_time(&commit.date),
                commit.url,
                commit.pr_number,
            ],
        )?;
        Ok(())
    }

    fn save_file_change(&self, change: &FileChange) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO file_changes
                (owner, repo, from_release, to_release, filename,
                 additions, deletions, changes, status, patch)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                change.owner,
                change.repo,
                change.from_release,
                change.to_release,
                change.filename,
                change.additions,
                change.deletions,
                change.changes,
                change.status.as_str(),
                change.patch,
            ],
        )?;
        Ok(())
    }

    fn get_release(&self, owner: &str, repo: &str, tag: &str) -> Result<Release, StoreError> {
        self.conn
            .lock()
            .query_row(
                "SELECT owner, repo, tag_name, name, published_at, commit_sha, body
                 FROM releases
                 WHERE owner = ?1 AND repo = ?2 AND tag_name = ?3",
                params![owner, repo, tag],
                release_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::release_not_found(owner, repo, tag))
    }

    fn get_releases(&self, owner: &str, repo: &str) -> Result<Vec<Release>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT owner, repo, tag_name, name, published_at, commit_sha, body
             FROM releases
             WHERE owner = ?1 AND repo = ?2
             ORDER BY published_at DESC",
        )?;
        let releases = stmt
            .query_map(params![owner, repo], release_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(releases)
    }

    fn get_commits_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<Commit>, StoreError> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT c.owner, c.repo, c.sha, c.message, c.author, c.author_email,
                    c.date, c.url, c.pr_number
             {COMMITS_IN_WINDOW}
             ORDER BY c.date ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let commits = stmt
            .query_map(params![owner, repo, from_tag, to_tag], commit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(commits)
    }

    fn get_file_changes(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<Vec<FileChange>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT owner, repo, from_release, to_release, filename,
                    additions, deletions, changes, status, patch
             FROM file_changes
             WHERE owner = ?1 AND repo = ?2 AND from_release = ?3 AND to_release = ?4",
        )?;
        let changes = stmt
            .query_map(params![owner, repo, from_tag, to_tag], file_change_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    fn has_file_changes_cached(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<bool, StoreError> {
        let exists: bool = self.conn.lock().query_row(
            "SELECT EXISTS(
                SELECT 1 FROM file_changes
                WHERE owner = ?1 AND repo = ?2 AND from_release = ?3 AND to_release = ?4
             )",
            params![owner, repo, from_tag, to_tag],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn count_cached_pairs(&self, owner: &str, repo: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM file_changes WHERE owner = ?1 AND repo = ?2",
            params![owner, repo],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn pr_count_between(
        &self,
        owner: &str,
        repo: &str,
        from_tag: &str,
        to_tag: &str,
    ) -> Result<u64, StoreError> {
        let sql = format!(
            "SELECT COUNT(DISTINCT c.pr_number)
             {COMMITS_IN_WINDOW}
               AND c.pr_number IS NOT NULL"
        );
        let count: i64 = self
            .conn
            .lock()
            .query_row(&sql, params![owner, repo, from_tag, to_tag], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Formats a timestamp for storage.
fn encode_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses a stored timestamp from column `idx`.
fn decode_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn release_from_row(row: &Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        owner: row.get(0)?,
        repo: row.get(1)?,
        tag_name: row.get(2)?,
        name: row.get(3)?,
        published_at: decode_time(row, 4)?,
        commit_sha: row.get(5)?,
        body: row.get(6)?,
    })
}

fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        owner: row.get(0)?,
        repo: row.get(1)?,
        sha: row.get(2)?,
        message: row.get(3)?,
        author: row.get(4)?,
        author_email: row.get(5)?,
        date: decode_time(row, 6)?,
        url: row.get(7)?,
        pr_number: row.get(8)?,
    })
}

fn file_change_from_row(row: &Row<'_>) -> rusqlite::Result<FileChange> {
    let status: String = row.get(8)?;
    Ok(FileChange {
        owner: row.get(0)?,
        repo: row.get(1)?,
        from_release: row.get(2)?,
        to_release: row.get(3)?,
        filename: row.get(4)?,
        additions: row.get(5)?,
        deletions: row.get(6)?,
        changes: row.get(7)?,
        status: status.into(),
        patch: row.get(9)?,
    })
}
