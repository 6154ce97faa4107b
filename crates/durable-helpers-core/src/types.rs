//! Data model shared by the query, wait and cleanup helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of an orchestration instance as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuntimeStatus {
    Pending,
    Running,
    ContinuedAsNew,
    Completed,
    Failed,
    Terminated,
    Canceled,
    /// Reported by engines for instances they cannot classify yet.
    Unknown,
}

impl RuntimeStatus {
    /// Statuses an instance can still leave. `Unknown` counts as still running.
    pub const NON_TERMINAL: [RuntimeStatus; 4] = [
        RuntimeStatus::Pending,
        RuntimeStatus::Running,
        RuntimeStatus::ContinuedAsNew,
        RuntimeStatus::Unknown,
    ];

    /// Statuses an instance never leaves once reached.
    pub const TERMINAL: [RuntimeStatus; 4] = [
        RuntimeStatus::Completed,
        RuntimeStatus::Failed,
        RuntimeStatus::Terminated,
        RuntimeStatus::Canceled,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RuntimeStatus::Completed
                | RuntimeStatus::Failed
                | RuntimeStatus::Terminated
                | RuntimeStatus::Canceled
        )
    }

    /// Returns true if moving from `self` to `next` keeps the lifecycle moving forward.
    ///
    /// Terminal statuses accept no transition at all, and nothing returns to `Pending`.
    pub fn can_transition_to(self, next: RuntimeStatus) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            RuntimeStatus::Pending => matches!(self, RuntimeStatus::Pending | RuntimeStatus::Unknown),
            RuntimeStatus::Unknown => self == RuntimeStatus::Unknown,
            _ => true,
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeStatus::Pending => "Pending",
            RuntimeStatus::Running => "Running",
            RuntimeStatus::ContinuedAsNew => "ContinuedAsNew",
            RuntimeStatus::Completed => "Completed",
            RuntimeStatus::Failed => "Failed",
            RuntimeStatus::Terminated => "Terminated",
            RuntimeStatus::Canceled => "Canceled",
            RuntimeStatus::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Read-only snapshot of one orchestration instance at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub instance_id: String,
    /// Orchestration (workflow type) name
    pub name: String,
    /// Task hub the instance lives in
    pub hub: String,
    pub runtime_status: RuntimeStatus,
    #[serde(default)]
    pub input: Option<Value>,
    /// Present only once the instance is terminal
    #[serde(default)]
    pub output: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl InstanceSummary {
    /// Creates a summary stamped with the current time.
    pub fn new(
        instance_id: impl Into<String>,
        name: impl Into<String>,
        hub: impl Into<String>,
        runtime_status: RuntimeStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            instance_id: instance_id.into(),
            name: name.into(),
            hub: hub.into(),
            runtime_status,
            input: None,
            output: None,
            created_at: now,
            last_updated_at: now,
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.runtime_status.is_terminal()
    }

    /// Renders the output as plain text.
    ///
    /// JSON strings are returned unquoted, other values in their JSON form and a
    /// missing or null output as an empty string.
    pub fn output_message(&self) -> String {
        match &self.output {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Criteria for listing instances.
///
/// Every field left as `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFilter {
    #[serde(default)]
    pub runtime_statuses: Option<BTreeSet<RuntimeStatus>>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hub: Option<String>,
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

impl StatusFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn includes_status(&self, status: RuntimeStatus) -> bool {
        self.runtime_statuses
            .as_ref()
            .map_or(true, |statuses| statuses.contains(&status))
    }

    /// Returns true if the instance satisfies every criterion of the filter.
    pub fn matches(&self, instance: &InstanceSummary) -> bool {
        if !self.includes_status(instance.runtime_status) {
            return false;
        }

        if let Some(name) = &self.name {
            if &instance.name != name {
                return false;
            }
        }

        if let Some(hub) = &self.hub {
            if &instance.hub != hub {
                return false;
            }
        }

        if let Some(from) = self.created_from {
            if instance.created_at < from {
                return false;
            }
        }

        if let Some(to) = self.created_to {
            if instance.created_at > to {
                return false;
            }
        }

        true
    }
}

/// What the engine reports back from a history purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResult {
    pub instances_deleted: usize,
}
