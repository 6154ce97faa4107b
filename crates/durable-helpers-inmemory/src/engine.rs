use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

use durable_helpers_core::{
    EngineError, InstanceSummary, OrchestrationClient, PurgeResult, RuntimeStatus, StatusFilter,
};

use crate::script::{OrchestrationScript, ScriptStep};

/// How many times each engine operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_instances: usize,
    pub terminate: usize,
    pub purge_history: usize,
}

#[derive(Default)]
struct Faults {
    unreachable: bool,
    queued: VecDeque<EngineError>,
}

struct StoredInstance {
    summary: InstanceSummary,
    task: Option<AbortHandle>,
}

#[derive(Default)]
struct EngineState {
    instances: RwLock<HashMap<String, StoredInstance>>,
    faults: Mutex<Faults>,
    calls: Mutex<CallCounts>,
}

/// An orchestration engine that keeps every task hub in memory.
///
/// Cloning is cheap and all clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<EngineState>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bound to one task hub of this engine
    pub fn client(&self, hub: impl Into<String>) -> InMemoryClient {
        InMemoryClient {
            engine: self.clone(),
            hub: hub.into(),
        }
    }

    /// Add an instance exactly as given, replacing any with the same id.
    pub async fn insert_instance(&self, summary: InstanceSummary) {
        let mut instances = self.state.instances.write().await;
        if let Some(previous) = instances.insert(
            summary.instance_id.clone(),
            StoredInstance {
                summary,
                task: None,
            },
        ) {
            abort(previous.task);
        }
    }

    /// Start a scripted instance of `name` in `hub` and return its id.
    ///
    /// The instance starts out Pending. Must be called from within a Tokio runtime.
    pub async fn start_orchestration(
        &self,
        hub: &str,
        name: &str,
        input: Option<Value>,
        script: OrchestrationScript,
    ) -> Result<String, EngineError> {
        let runtime = Handle::try_current()
            .map_err(|e| EngineError::Other(format!("No Tokio runtime to run the orchestration on: {}", e)))?;

        let instance_id = Uuid::new_v4().to_string();
        let mut summary = InstanceSummary::new(&instance_id, name, hub, RuntimeStatus::Pending);
        summary.input = input;

        let mut instances = self.state.instances.write().await;
        let task = runtime.spawn(run_script(self.clone(), instance_id.clone(), script));
        instances.insert(
            instance_id.clone(),
            StoredInstance {
                summary,
                task: Some(task.abort_handle()),
            },
        );

        info!(instance_id = %instance_id, name, hub, "Started orchestration");
        Ok(instance_id)
    }

    pub async fn instance(&self, instance_id: &str) -> Option<InstanceSummary> {
        let instances = self.state.instances.read().await;
        instances.get(instance_id).map(|stored| stored.summary.clone())
    }

    /// Every instance in every hub
    pub async fn instances(&self) -> Vec<InstanceSummary> {
        let instances = self.state.instances.read().await;
        instances.values().map(|stored| stored.summary.clone()).collect()
    }

    /// Move an instance to `next`, rejecting anything that would move its lifecycle backwards.
    pub async fn transition(
        &self,
        instance_id: &str,
        next: RuntimeStatus,
        output: Option<Value>,
    ) -> Result<(), EngineError> {
        let mut instances = self.state.instances.write().await;
        let stored = instances
            .get_mut(instance_id)
            .ok_or_else(|| EngineError::InstanceNotFound(instance_id.to_string()))?;

        let current = stored.summary.runtime_status;
        if !current.can_transition_to(next) {
            return Err(EngineError::Other(format!(
                "Instance {} cannot move from {} to {}",
                instance_id, current, next
            )));
        }

        stored.summary.runtime_status = next;
        stored.summary.last_updated_at = Utc::now();
        if output.is_some() {
            stored.summary.output = output;
        }
        if next.is_terminal() {
            stored.task = None;
        }

        debug!(instance_id, from = %current, to = %next, "Instance transitioned");
        Ok(())
    }

    /// Every engine call fails with `Unreachable` while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.faults.lock().unreachable = unreachable;
    }

    /// Fail the next engine call with `error`. Queued errors are used in order.
    pub fn fail_next(&self, error: EngineError) {
        self.state.faults.lock().queued.push_back(error);
    }

    pub fn calls(&self) -> CallCounts {
        *self.state.calls.lock()
    }

    fn check_faults(&self) -> Result<(), EngineError> {
        let mut faults = self.state.faults.lock();
        if faults.unreachable {
            return Err(EngineError::Unreachable("in-memory engine is offline".to_string()));
        }
        match faults.queued.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn list(&self, filter: &StatusFilter) -> Result<Vec<InstanceSummary>, EngineError> {
        self.state.calls.lock().list_instances += 1;
        self.check_faults()?;

        let instances = self.state.instances.read().await;
        Ok(instances
            .values()
            .filter(|stored| filter.matches(&stored.summary))
            .map(|stored| stored.summary.clone())
            .collect())
    }

    async fn terminate_in(&self, hub: &str, instance_id: &str, reason: &str) -> Result<(), EngineError> {
        self.state.calls.lock().terminate += 1;
        self.check_faults()?;

        let mut instances = self.state.instances.write().await;
        let stored = instances
            .get_mut(instance_id)
            .filter(|stored| stored.summary.hub == hub)
            .ok_or_else(|| EngineError::InstanceNotFound(instance_id.to_string()))?;

        if stored.summary.is_terminal() {
            return Ok(());
        }

        stored.summary.runtime_status = RuntimeStatus::Terminated;
        stored.summary.output = Some(Value::String(reason.to_string()));
        stored.summary.last_updated_at = Utc::now();
        abort(stored.task.take());

        info!(instance_id, hub, reason, "Terminated orchestration");
        Ok(())
    }

    async fn purge_in(
        &self,
        hub: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        statuses: &[RuntimeStatus],
    ) -> Result<PurgeResult, EngineError> {
        self.state.calls.lock().purge_history += 1;
        self.check_faults()?;

        let filter = StatusFilter {
            runtime_statuses: Some(statuses.iter().copied().collect()),
            hub: Some(hub.to_string()),
            created_from: Some(from),
            created_to: to,
            ..Default::default()
        };

        let mut instances = self.state.instances.write().await;
        let before = instances.len();
        instances.retain(|_, stored| !filter.matches(&stored.summary));
        let instances_deleted = before - instances.len();

        info!(hub, instances_deleted, "Purged instance history");
        Ok(PurgeResult { instances_deleted })
    }
}

fn abort(task: Option<AbortHandle>) {
    if let Some(task) = task {
        task.abort();
    }
}

async fn run_script(engine: InMemoryEngine, instance_id: String, script: OrchestrationScript) {
    if let Err(e) = engine.transition(&instance_id, RuntimeStatus::Running, None).await {
        debug!(instance_id = %instance_id, error = %e, "Script did not start");
        return;
    }

    for step in script.steps {
        let result = match step {
            ScriptStep::Work { millis } => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(())
            }
            ScriptStep::ContinueAsNew { millis } => {
                match engine
                    .transition(&instance_id, RuntimeStatus::ContinuedAsNew, None)
                    .await
                {
                    Ok(()) => {
                        tokio::time::sleep(Duration::from_millis(millis)).await;
                        engine.transition(&instance_id, RuntimeStatus::Running, None).await
                    }
                    Err(e) => Err(e),
                }
            }
            ScriptStep::Complete { output } => {
                let result = engine
                    .transition(&instance_id, RuntimeStatus::Completed, Some(output))
                    .await;
                finish(&instance_id, result);
                return;
            }
            ScriptStep::Fail { output } => {
                let result = engine
                    .transition(&instance_id, RuntimeStatus::Failed, Some(output))
                    .await;
                finish(&instance_id, result);
                return;
            }
        };

        if let Err(e) = result {
            debug!(instance_id = %instance_id, error = %e, "Script stopped");
            return;
        }
    }
}

fn finish(instance_id: &str, result: Result<(), EngineError>) {
    if let Err(e) = result {
        debug!(instance_id, error = %e, "Script could not finish");
    }
}

/// [`OrchestrationClient`] bound to one hub of an [`InMemoryEngine`].
#[derive(Clone)]
pub struct InMemoryClient {
    engine: InMemoryEngine,
    hub: String,
}

impl InMemoryClient {
    pub fn engine(&self) -> &InMemoryEngine {
        &self.engine
    }

    /// Start a scripted instance in this client's hub.
    pub async fn start_orchestration(
        &self,
        name: &str,
        script: OrchestrationScript,
    ) -> Result<String, EngineError> {
        self.engine.start_orchestration(&self.hub, name, None, script).await
    }

    pub async fn start_orchestration_with_input(
        &self,
        name: &str,
        input: Value,
        script: OrchestrationScript,
    ) -> Result<String, EngineError> {
        self.engine
            .start_orchestration(&self.hub, name, Some(input), script)
            .await
    }

    /// Add an instance in this client's hub.
    pub async fn insert(&self, instance_id: &str, name: &str, status: RuntimeStatus) -> InstanceSummary {
        let summary = InstanceSummary::new(instance_id, name, self.hub.as_str(), status);
        self.engine.insert_instance(summary.clone()).await;
        summary
    }
}

#[async_trait]
impl OrchestrationClient for InMemoryClient {
    fn task_hub_name(&self) -> &str {
        &self.hub
    }

    async fn list_instances(&self, filter: &StatusFilter) -> Result<Vec<InstanceSummary>, EngineError> {
        self.engine.list(filter).await
    }

    async fn terminate(&self, instance_id: &str, reason: &str) -> Result<(), EngineError> {
        self.engine.terminate_in(&self.hub, instance_id, reason).await
    }

    async fn purge_history(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        statuses: &[RuntimeStatus],
    ) -> Result<PurgeResult, EngineError> {
        self.engine.purge_in(&self.hub, from, to, statuses).await
    }
}
