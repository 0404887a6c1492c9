//! API request and response models.

use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/index`.
///
/// Fields are optional so a missing one is reported as a 400 with a
/// readable message instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct IndexRequest {
    pub owner: Option<String>,
    pub repo: Option<String>,
}

impl IndexRequest {
    /// Returns trimmed `(owner, repo)`, or the message for a 400.
    pub fn validate(&self) -> Result<(String, String), &'static str> {
        let owner = self.owner.as_deref().map(str::trim).unwrap_or_default();
        let repo = self.repo.as_deref().map(str::trim).unwrap_or_default();
        if owner.is_empty() || repo.is_empty() {
            return Err("owner and repo are required");
        }
        Ok((owner.to_string(), repo.to_string()))
    }
}

/// Query of `/api/compare` and `/api/summary`.
#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub from: String,
    pub to: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Response to an accepted indexing request.
#[derive(Debug, Serialize)]
pub struct IndexStarted {
    pub status: &'static str,
    pub owner: String,
    pub repo: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
