//! Release pairing and progress estimation.

use crate::config::{IndexConfig, DEFAULT_FETCH_BAND_END, DEFAULT_PERSIST_BAND_END, PROGRESS_TOTAL};
use crate::models::Release;

/// Two consecutive releases, compared from the older to the newer one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePair {
    pub older: Release,
    pub newer: Release,
}

impl ReleasePair {
    /// Tag of the older release.
    pub fn from_tag(&self) -> &str {
        &self.older.tag_name
    }

    /// Tag of the newer release.
    pub fn to_tag(&self) -> &str {
        &self.newer.tag_name
    }

    /// Whether both releases carry a commit pointer.
    pub fn is_resolvable(&self) -> bool {
        self.older.has_commit() && self.newer.has_commit()
    }
}

/// Builds the consecutive pairs of a newest-first release list.
///
/// For `[R0, R1, .., Rn]` this yields `[(R1, R0), (R2, R1), .., (Rn, Rn-1)]`,
/// newest gap first.
pub fn release_pairs(releases: &[Release]) -> Vec<ReleasePair> {
    releases
        .windows(2)
        .map(|w| ReleasePair {
            older: w[1].clone(),
            newer: w[0].clone(),
        })
        .collect()
}

/// Maps run phases onto a `0..=total` progress scale.
///
/// ```text
/// 0 ........ fetch_end ........ persist_end ........................ total
///   fetch releases    persist releases        process release pairs
/// ```
///
/// The pair estimate is `processed / (processed + remaining + 1)` where
/// `remaining` excludes skipped pairs, so it never reaches `total` while
/// the loop is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPlan {
    fetch_end: u32,
    persist_end: u32,
    total: u32,
}

impl Default for ProgressPlan {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_BAND_END, DEFAULT_PERSIST_BAND_END)
    }
}

impl ProgressPlan {
    /// Creates a plan on the [`PROGRESS_TOTAL`] scale. Band ends are clamped
    /// so that `fetch_end <= persist_end <= total`.
    pub fn new(fetch_end: u32, persist_end: u32) -> Self {
        let persist_end = persist_end.min(PROGRESS_TOTAL);
        Self {
            fetch_end: fetch_end.min(persist_end),
            persist_end,
            total: PROGRESS_TOTAL,
        }
    }

    pub fn from_config(config: &IndexConfig) -> Self {
        Self::new(config.fetch_band_end, config.persist_band_end)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Progress after `pages_fetched` release pages. Holds at the band start
    /// while the page count is unknown.
    pub fn fetch(&self, pages_fetched: u32, last_page: Option<u32>) -> u32 {
        match last_page {
            Some(last) => scale(0, self.fetch_end, pages_fetched as u64, last as u64),
            None => 0,
        }
    }

    /// Progress after persisting `saved` of `total` releases.
    pub fn persist(&self, saved: usize, total: usize) -> u32 {
        scale(self.fetch_end, self.persist_end, saved as u64, total as u64)
    }

    /// Progress at the start of pair processing.
    pub fn pairs_start(&self) -> u32 {
        self.persist_end
    }

    /// Progress after `processed` pairs were indexed and `skipped` found cached,
    /// out of `total_pairs`.
    pub fn pair(&self, processed: usize, skipped: usize, total_pairs: usize) -> u32 {
        let denominator = total_pairs.saturating_sub(skipped) + 1;
        scale(self.persist_end, self.total, processed as u64, denominator as u64)
    }
}

/// `start + (end - start) * num / den`, with `num` clamped to `den`.
fn scale(start: u32, end: u32, num: u64, den: u64) -> u32 {
    if den == 0 {
        return end;
    }
    let width = end.saturating_sub(start) as u64;
    start + (width * num.min(den) / den) as u32
}
