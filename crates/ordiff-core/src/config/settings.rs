use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ConfigError;

/// The repository comparison commands act on when none is given.
///
/// Written after every successful indexing run and stored as YAML:
/// ```yaml
/// default_owner: ollama
/// default_repo: ollama
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoSettings {
    pub default_owner: Option<String>,
    pub default_repo: Option<String>,
}

impl RepoSettings {
    /// Creates settings pointing at `owner/repo`.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            default_owner: Some(owner.into()),
            default_repo: Some(repo.into()),
        }
    }

    /// Loads settings from `path`. A missing file yields empty settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(&content)?)
    }

    /// Writes settings to `path`, replacing any previous content.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// The default `(owner, repo)`, if both are set and non-empty.
    pub fn default_repo(&self) -> Option<(&str, &str)> {
        match (self.default_owner.as_deref(), self.default_repo.as_deref()) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Some((owner, repo))
            }
            _ => None,
        }
    }
}
