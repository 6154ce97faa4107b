//! One-shot query-and-act stages composed after a wait.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::client::JobsHandle;
use crate::error::{AggregateFailure, EngineError, HelperResult};
use crate::predicates::WaitCondition;
use crate::types::RuntimeStatus;
use crate::waiter::{PollConfig, Waiter};

/// Reason attached to every terminate request unless the caller gives one
pub const DEFAULT_TERMINATE_REASON: &str = "just cleaning.";

/// Statuses whose history `purge` removes
pub const PURGEABLE_STATUSES: [RuntimeStatus; 4] = RuntimeStatus::TERMINAL;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub instances_deleted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminateReport {
    /// Number of terminate requests acknowledged by the engine
    pub requested: usize,
}

/// Fails with one error per Failed instance in the hub. Read-only.
pub async fn throw_if_failed(handle: &JobsHandle) -> HelperResult<()> {
    let failed = handle
        .query()
        .with_statuses([RuntimeStatus::Failed])
        .fetch()
        .await?;

    if failed.is_empty() {
        debug!(hub = %handle.hub(), "No failed orchestration instances");
        return Ok(());
    }

    let aggregate = AggregateFailure::from_instances(&failed);
    warn!(hub = %handle.hub(), failed = aggregate.len(), "Orchestration instances failed");
    Err(aggregate.into())
}

/// Deletes the history of every terminal instance in the hub, across all time.
///
/// Irreversible: outputs needed by [`throw_if_failed`] are gone afterwards.
pub async fn purge(handle: &JobsHandle) -> HelperResult<PurgeReport> {
    purge_statuses(handle, &PURGEABLE_STATUSES).await
}

/// Deletes the history of every instance in one of `statuses`.
pub async fn purge_statuses(handle: &JobsHandle, statuses: &[RuntimeStatus]) -> HelperResult<PurgeReport> {
    let result = handle
        .client()
        .purge_history(DateTime::<Utc>::MIN_UTC, None, statuses)
        .await?;

    info!(
        hub = %handle.hub(),
        instances_deleted = result.instances_deleted,
        "Purged orchestration history"
    );
    Ok(PurgeReport {
        instances_deleted: result.instances_deleted,
    })
}

/// Requests termination of every non-terminal instance in the hub.
///
/// Requests are issued concurrently. Returns once all are acknowledged, which
/// is not the same as terminated; wait again if that matters. An instance
/// purged between the listing and its request counts as acknowledged.
pub async fn terminate(handle: &JobsHandle, reason: &str) -> HelperResult<TerminateReport> {
    let running = handle.query().non_terminal().fetch().await?;
    let client = handle.client();

    try_join_all(running.iter().map(|instance| async move {
        match client.terminate(&instance.instance_id, reason).await {
            Err(EngineError::InstanceNotFound(id)) => {
                debug!(instance_id = %id, "Instance gone before terminate");
                Ok(())
            }
            other => other,
        }
    }))
    .await?;

    info!(hub = %handle.hub(), requested = running.len(), reason, "Requested termination");
    Ok(TerminateReport {
        requested: running.len(),
    })
}

/// Waits for readiness, raises on failures, then purges Completed history only.
///
/// Failed and Terminated history is left in place for diagnosis.
pub async fn wait_for_orchestrations_completion(handle: &JobsHandle, config: PollConfig) -> HelperResult<()> {
    Waiter::new(handle.clone(), WaitCondition::Ready)
        .with_config(config)
        .wait()
        .await?;
    throw_if_failed(handle).await?;
    purge_statuses(handle, &[RuntimeStatus::Completed]).await?;
    Ok(())
}
