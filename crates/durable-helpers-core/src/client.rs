//! Boundary to the external orchestration engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::query::StatusQuery;
use crate::types::{InstanceSummary, PurgeResult, RuntimeStatus, StatusFilter};

/// The minimum an orchestration engine client must offer the helpers.
///
/// A client is bound to one task hub; `task_hub_name` is the default scope of
/// every query issued through a [`JobsHandle`].
#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    /// Name of the task hub this client is connected to
    fn task_hub_name(&self) -> &str;

    /// List instances matching the filter. Result order is unspecified.
    async fn list_instances(&self, filter: &StatusFilter) -> Result<Vec<InstanceSummary>, EngineError>;

    /// Request termination of one instance. Terminating a terminal instance is a no-op.
    async fn terminate(&self, instance_id: &str, reason: &str) -> Result<(), EngineError>;

    /// Delete the history of instances created in `[from, to]` whose status is in `statuses`.
    async fn purge_history(
        &self,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
        statuses: &[RuntimeStatus],
    ) -> Result<PurgeResult, EngineError>;
}

/// The connected engine plus the hub every stage operates on.
#[derive(Clone)]
pub struct JobsHandle {
    client: Arc<dyn OrchestrationClient>,
    hub: String,
}

impl JobsHandle {
    pub fn new(client: Arc<dyn OrchestrationClient>) -> Self {
        let hub = client.task_hub_name().to_string();
        Self { client, hub }
    }

    pub fn client(&self) -> &Arc<dyn OrchestrationClient> {
        &self.client
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Start a status query scoped to this handle's hub.
    pub fn query(&self) -> StatusQuery {
        StatusQuery::new(self)
    }
}

impl fmt::Debug for JobsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobsHandle")
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}
