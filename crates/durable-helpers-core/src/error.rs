use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::InstanceSummary;

/// Errors raised by an orchestration engine client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not be reached
    #[error("Engine unreachable: {0}")]
    Unreachable(String),

    /// The engine rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Instance not found
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// Generic engine error
    #[error("Engine error: {0}")]
    Other(String),
}

/// One orchestration instance that ended in the Failed state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceFailure {
    pub instance_id: String,
    pub name: String,
    /// Failure description taken from the instance output
    pub message: String,
}

impl InstanceFailure {
    pub fn from_instance(instance: &InstanceSummary) -> Self {
        Self {
            instance_id: instance.instance_id.clone(),
            name: instance.name.clone(),
            message: instance.output_message(),
        }
    }
}

impl fmt::Display for InstanceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.instance_id, self.message)
    }
}

impl std::error::Error for InstanceFailure {}

/// One or more orchestration instances failed; carries one error per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateFailure {
    failures: Vec<InstanceFailure>,
}

impl AggregateFailure {
    pub fn new(failures: Vec<InstanceFailure>) -> Self {
        Self { failures }
    }

    pub fn from_instances<'a>(instances: impl IntoIterator<Item = &'a InstanceSummary>) -> Self {
        Self::new(instances.into_iter().map(InstanceFailure::from_instance).collect())
    }

    pub fn failures(&self) -> &[InstanceFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.message.as_str()).collect()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} orchestration instance(s) failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let separator = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", separator, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

/// Error type for the orchestration helpers
#[derive(Debug, Error)]
pub enum HelperError {
    /// The engine call failed; never retried by the helpers
    #[error("Transport error: {0}")]
    Transport(#[from] EngineError),

    /// The wait deadline passed, or the wait was cancelled, before the condition held
    #[error("Timed out after {waited:?} waiting for {condition}")]
    Timeout { condition: String, waited: Duration },

    /// Orchestration instances ended in the Failed state
    #[error(transparent)]
    Failed(#[from] AggregateFailure),

    /// No helper function registered under that name
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// A function argument was missing or had the wrong type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No function manifest below the content root
    #[error("No function.json found beneath {0}")]
    ManifestNotFound(String),

    /// A remote function host failed for a reason other than the above
    #[error("Function host error: {0}")]
    Remote(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type HelperResult<T> = Result<T, HelperError>;

impl HelperError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HelperError::Timeout { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, HelperError::Transport(_))
    }

    /// The aggregated instance failures, if this is a failure report.
    pub fn failure(&self) -> Option<&AggregateFailure> {
        match self {
            HelperError::Failed(aggregate) => Some(aggregate),
            _ => None,
        }
    }
}
