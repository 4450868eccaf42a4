//! Configuration loading from JSON

use crate::aws::athena::EncryptionSettings;
use garde::Validate;
use opwait_common::WaitSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-2";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Parsed but failed validation
    #[error("Invalid config: {0}")]
    Invalid(#[from] garde::Report),
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Settings shared by every command, loaded from JSON and overridden by flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AthenaConfig {
    /// AWS region (default: us-east-2)
    #[serde(default = "default_region")]
    #[garde(length(min = 1))]
    pub region: String,

    /// Named AWS profile; the default credential chain when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub aws_profile: Option<String>,

    /// Athena work group; the account default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(inner(length(min = 1)))]
    pub work_group: Option<String>,

    /// Default S3 bucket for query results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(inner(length(min = 1)))]
    pub bucket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub encryption: Option<EncryptionSettings>,

    #[serde(default)]
    #[garde(dive)]
    pub wait: WaitSettings,
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            aws_profile: None,
            work_group: None,
            bucket: None,
            encryption: None,
            wait: WaitSettings::default(),
        }
    }
}

impl AthenaConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}
