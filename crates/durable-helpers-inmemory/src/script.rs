//! Scripted orchestration behaviour.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One step of a scripted orchestration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScriptStep {
    /// Stay Running for a while
    Work { millis: u64 },

    /// Report ContinuedAsNew for a while, then go back to Running
    ContinueAsNew { millis: u64 },

    /// Finish as Completed with the output
    Complete { output: Value },

    /// Finish as Failed with the output
    Fail { output: Value },
}

/// The steps an instance runs through after it is started.
///
/// An instance whose script runs out without finishing stays Running until
/// it is terminated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationScript {
    #[serde(default)]
    pub steps: Vec<ScriptStep>,
}

impl OrchestrationScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completes_after(work: Duration, output: impl Into<Value>) -> Self {
        Self::new().work(work).complete(output)
    }

    pub fn fails_after(work: Duration, output: impl Into<Value>) -> Self {
        Self::new().work(work).fail(output)
    }

    pub fn runs_until_terminated() -> Self {
        Self::new()
    }

    pub fn work(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Work {
            millis: millis(duration),
        });
        self
    }

    pub fn continue_as_new(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::ContinueAsNew {
            millis: millis(duration),
        });
        self
    }

    pub fn complete(mut self, output: impl Into<Value>) -> Self {
        self.steps.push(ScriptStep::Complete {
            output: output.into(),
        });
        self
    }

    pub fn fail(mut self, output: impl Into<Value>) -> Self {
        self.steps.push(ScriptStep::Fail {
            output: output.into(),
        });
        self
    }

    /// Returns true if the script ends in a terminal status on its own
    pub fn finishes(&self) -> bool {
        self.steps
            .iter()
            .any(|step| matches!(step, ScriptStep::Complete { .. } | ScriptStep::Fail { .. }))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
