//! Driver configuration.
//!
//! ```toml
//! policy = "fail-fast"
//! max-depth = 8
//! record-patches = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read driver config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid driver config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// What a run does after the first failing property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first error.
    FailFast,
    /// Check every property and report all errors.
    #[default]
    CollectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DriverConfig {
    pub policy: FailurePolicy,
    /// Maximum nesting of object schemas walked in place.
    pub max_depth: usize,
    /// Whether reports list the patches applied during the run.
    pub record_patches: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::CollectAll,
            max_depth: 32,
            record_patches: true,
        }
    }
}

impl DriverConfig {
    pub fn fail_fast() -> Self {
        Self {
            policy: FailurePolicy::FailFast,
            ..Default::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn stops_at_first_error(&self) -> bool {
        self.policy == FailurePolicy::FailFast
    }
}
