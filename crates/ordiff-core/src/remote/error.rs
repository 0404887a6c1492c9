use thiserror::Error;

/// Errors that can occur talking to the remote history source.
///
/// None of these are retried in place; a later indexing run picks the
/// affected work up again.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// `reset_at` is the Unix time the quota resets, when reported.
    #[error("Rate limited. Try again later or configure a token.")]
    RateLimited { reset_at: Option<i64> },

    #[error("API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Parse(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}
