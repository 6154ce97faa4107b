//! Failure assertion, termination and purge against the in-memory engine.

use assert_matches::assert_matches;
use durable_helpers_core::{EngineError, HelperError, PollConfig, RuntimeStatus};
use durable_helpers_inmemory::OrchestrationScript;
use durable_helpers_test_utils::assertions::{assert_failed_with, assert_runtime_status, find_instance};
use durable_helpers_tests::{fast_poll, Fixture};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_throw_if_failed_reports_each_failed_instance() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("ok", "Job", RuntimeStatus::Completed).await;
    let failed = fixture
        .client
        .insert("bad", "Job", RuntimeStatus::Failed)
        .await
        .with_output(json!("boom"));
    fixture.engine.insert_instance(failed).await;

    let result = fixture.host.jobs().throw_if_failed().await;

    let failure = assert_matches!(result, Err(HelperError::Failed(failure)) => failure);
    assert_eq!(failure.len(), 1);
    assert_eq!(failure.failures()[0].instance_id, "bad");
    assert_eq!(failure.messages(), vec!["boom"]);
    Ok(())
}

#[tokio::test]
async fn test_throw_if_failed_passes_when_all_completed() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("1", "Job", RuntimeStatus::Completed).await;
    fixture.client.insert("2", "Job", RuntimeStatus::Completed).await;

    fixture.host.jobs().throw_if_failed().await?;
    Ok(())
}

#[tokio::test]
async fn test_purge_after_throw_if_failed_leaves_running_instances() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("c1", "Job", RuntimeStatus::Completed).await;
    fixture.client.insert("c2", "Job", RuntimeStatus::Completed).await;
    fixture.client.insert("f1", "Job", RuntimeStatus::Failed).await;
    fixture.client.insert("r1", "Job", RuntimeStatus::Running).await;

    let jobs = fixture.host.jobs();
    assert_matches!(jobs.clone().throw_if_failed().await, Err(HelperError::Failed(_)));
    jobs.purge().await?;

    let left = fixture.engine.instances().await;
    assert_eq!(left.len(), 1);
    assert_runtime_status(find_instance(&left, "r1")?, RuntimeStatus::Running)?;
    Ok(())
}

#[tokio::test]
async fn test_purge_twice_is_a_no_op() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("c1", "Job", RuntimeStatus::Completed).await;
    fixture.client.insert("r1", "Job", RuntimeStatus::Running).await;

    fixture.host.jobs().purge().await?.purge().await?;

    let left = fixture.engine.instances().await;
    assert_eq!(left.len(), 1);
    assert_eq!(fixture.engine.calls().purge_history, 2);
    Ok(())
}

#[tokio::test]
async fn test_purge_first_loses_failure_detail() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("f1", "Job", RuntimeStatus::Failed).await;

    fixture.host.jobs().purge().await?.throw_if_failed().await?;
    Ok(())
}

#[tokio::test]
async fn test_terminate_then_purge() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let first = fixture.start("Job", OrchestrationScript::runs_until_terminated()).await?;
    fixture.start("Job", OrchestrationScript::runs_until_terminated()).await?;
    fixture.client.insert("done", "Job", RuntimeStatus::Completed).await;

    let jobs = fixture.host.jobs().terminate().await?;

    let terminated = fixture.engine.instance(&first).await.expect("instance exists");
    assert_runtime_status(&terminated, RuntimeStatus::Terminated)?;
    assert_eq!(terminated.output, Some(json!("just cleaning.")));
    assert_eq!(fixture.engine.calls().terminate, 2);

    jobs.ready(fast_poll(Duration::from_secs(5)))
        .await?
        .throw_if_failed()
        .await?
        .purge()
        .await?;

    assert!(fixture.engine.instances().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_terminate_with_nothing_running() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("done", "Job", RuntimeStatus::Completed).await;

    fixture.host.jobs().terminate_with_reason("tear down").await?;

    assert_eq!(fixture.engine.calls().terminate, 0);
    Ok(())
}

#[tokio::test]
async fn test_wait_for_completion_purges_completed_only() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .start("Job", OrchestrationScript::completes_after(Duration::from_millis(50), "done"))
        .await?;
    fixture.client.insert("t1", "Job", RuntimeStatus::Terminated).await;

    fixture
        .host
        .jobs()
        .wait_for_orchestrations_completion(fast_poll(Duration::from_secs(5)))
        .await?;

    let left = fixture.engine.instances().await;
    assert_eq!(left.len(), 1);
    assert_runtime_status(&left[0], RuntimeStatus::Terminated)?;
    Ok(())
}

#[tokio::test]
async fn test_wait_for_completion_raises_and_keeps_history() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let id = fixture
        .start("Job", OrchestrationScript::fails_after(Duration::from_millis(50), "boom"))
        .await?;

    let result = fixture
        .host
        .jobs()
        .wait_for_orchestrations_completion(fast_poll(Duration::from_secs(5)))
        .await;

    assert_matches!(result, Err(HelperError::Failed(_)));
    let failed = fixture.engine.instance(&id).await.expect("history kept");
    assert_failed_with(&failed, "boom")?;
    Ok(())
}

#[tokio::test]
async fn test_transport_errors_are_not_retried() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.engine.set_unreachable(true);

    let result = fixture.host.jobs().ready(PollConfig::new()).await;

    assert_matches!(result, Err(HelperError::Transport(EngineError::Unreachable(_))));
    assert_eq!(fixture.engine.calls().list_instances, 1);
    Ok(())
}
