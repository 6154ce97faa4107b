use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use durable_helpers_core::{LoggingConfig, PollDefaults};

use crate::error::TestHostError;

/// Everything a test host needs, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Task hub the helpers operate on
    #[serde(default = "default_hub_name")]
    pub hub_name: String,

    #[serde(default)]
    pub storage: StorageConfig,

    /// Directory holding the function folders
    #[serde(default)]
    pub script_root: Option<PathBuf>,

    #[serde(default)]
    pub workers_directory: Option<PathBuf>,

    /// Port of the HTTP function host; 0 picks a free one
    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub poll: PollDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_hub_name() -> String {
    "TestHubName".to_string()
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            hub_name: default_hub_name(),
            storage: StorageConfig::default(),
            script_root: None,
            workers_directory: None,
            port: 0,
            poll: PollDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl HostConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TestHostError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, TestHostError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

/// Storage backing the orchestration engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_connection_string")]
    pub connection_string: String,
}

fn default_connection_string() -> String {
    "UseDevelopmentStorage=true".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string(),
        }
    }
}
