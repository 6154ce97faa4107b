//! Status queries against the engine.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::client::{JobsHandle, OrchestrationClient};
use crate::error::HelperResult;
use crate::types::{InstanceSummary, RuntimeStatus, StatusFilter};

/// Builds a [`StatusFilter`] and issues it against the engine.
///
/// Queries start scoped to the hub of the handle they were created from.
#[derive(Clone)]
pub struct StatusQuery {
    client: Arc<dyn OrchestrationClient>,
    filter: StatusFilter,
}

impl StatusQuery {
    pub fn new(handle: &JobsHandle) -> Self {
        Self {
            client: handle.client().clone(),
            filter: StatusFilter {
                hub: Some(handle.hub().to_string()),
                ..Default::default()
            },
        }
    }

    /// Replace the whole filter, hub scoping included.
    pub fn with_filter(mut self, filter: StatusFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = RuntimeStatus>) -> Self {
        self.filter.runtime_statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn non_terminal(self) -> Self {
        self.with_statuses(RuntimeStatus::NON_TERMINAL)
    }

    pub fn terminal(self) -> Self {
        self.with_statuses(RuntimeStatus::TERMINAL)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.filter.name = Some(name.into());
        self
    }

    pub fn in_hub(mut self, hub: impl Into<String>) -> Self {
        self.filter.hub = Some(hub.into());
        self
    }

    pub fn all_hubs(mut self) -> Self {
        self.filter.hub = None;
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        self.filter.created_from = Some(from);
        self.filter.created_to = to;
        self
    }

    pub fn filter(&self) -> &StatusFilter {
        &self.filter
    }

    /// Issue the query once. Transport failures are returned as-is, not retried.
    pub async fn fetch(&self) -> HelperResult<Vec<InstanceSummary>> {
        let instances = self.client.list_instances(&self.filter).await?;
        let normalized = normalize(&self.filter, instances);
        debug!(
            hub = ?self.filter.hub,
            name = ?self.filter.name,
            count = normalized.len(),
            "Listed orchestration instances"
        );
        Ok(normalized)
    }
}

/// Re-applies the filter locally and drops duplicate instance ids.
///
/// Engines may ignore criteria they do not support.
pub fn normalize(filter: &StatusFilter, instances: Vec<InstanceSummary>) -> Vec<InstanceSummary> {
    let mut seen = HashSet::new();
    instances
        .into_iter()
        .filter(|instance| filter.matches(instance))
        .filter(|instance| seen.insert(instance.instance_id.clone()))
        .collect()
}
