//! Waiting on a single "Job" orchestration, on the paused Tokio clock.

use assert_matches::assert_matches;
use durable_helpers_core::{HelperError, PollConfig, RuntimeStatus};
use durable_helpers_inmemory::OrchestrationScript;
use durable_helpers_tests::Fixture;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_wait_for_job_returns_after_work_finishes() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let id = fixture
        .start("Job", OrchestrationScript::completes_after(Duration::from_secs(2), "done"))
        .await?;

    let started = Instant::now();
    fixture
        .host
        .jobs()
        .wait_for("Job", PollConfig::new().with_timeout(Duration::from_secs(20)))
        .await?;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(2), "returned after {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(7), "returned after {:?}", elapsed);

    let job = fixture.engine.instance(&id).await.expect("instance exists");
    assert_eq!(job.runtime_status, RuntimeStatus::Completed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_with_fast_retry() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .start("Job", OrchestrationScript::completes_after(Duration::from_secs(2), "done"))
        .await?;

    let started = Instant::now();
    fixture
        .host
        .jobs()
        .wait_for(
            "Job",
            PollConfig::new()
                .with_timeout(Duration::from_secs(20))
                .with_retry_delay(Duration::from_millis(100)),
        )
        .await?;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed <= Duration::from_millis(2200), "returned after {:?}", elapsed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_times_out_on_endless_job() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .start("Job", OrchestrationScript::runs_until_terminated())
        .await?;

    let started = Instant::now();
    let result = fixture
        .host
        .jobs()
        .wait_for("Job", PollConfig::new().with_timeout(Duration::from_secs(20)))
        .await;
    let elapsed = started.elapsed();

    assert_matches!(result, Err(HelperError::Timeout { condition, .. }) if condition == "completion of 'Job'");
    assert!(elapsed >= Duration::from_secs(20));
    assert!(elapsed < Duration::from_secs(25), "timed out after {:?}", elapsed);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_does_not_raise_on_failed_job() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .start("Job", OrchestrationScript::fails_after(Duration::from_secs(1), "boom"))
        .await?;

    let jobs = fixture
        .host
        .jobs()
        .wait_for("Job", PollConfig::new().with_timeout(Duration::from_secs(20)))
        .await?;

    assert_matches!(jobs.throw_if_failed().await, Err(HelperError::Failed(failure)) if failure.messages() == vec!["boom"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ready_waits_for_every_orchestration_in_hub() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .start("Job", OrchestrationScript::completes_after(Duration::from_secs(2), "done"))
        .await?;
    fixture
        .start("Other", OrchestrationScript::completes_after(Duration::from_secs(12), "done"))
        .await?;

    let started = Instant::now();
    fixture
        .host
        .jobs()
        .ready(PollConfig::new().with_timeout(Duration::from_secs(30)))
        .await?;

    assert!(started.elapsed() >= Duration::from_secs(12));
    assert!(fixture.engine.instances().await.iter().all(|i| i.is_terminal()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_other_hubs_do_not_block_readiness() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture
        .engine
        .client("someone-elses-hub")
        .start_orchestration("Job", OrchestrationScript::runs_until_terminated())
        .await?;

    let started = Instant::now();
    fixture
        .host
        .jobs()
        .ready(PollConfig::new().with_timeout(Duration::from_secs(10)))
        .await?;

    assert_eq!(started.elapsed(), Duration::ZERO);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_instances_block_readiness_until_terminated() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("u1", "Job", RuntimeStatus::Unknown).await;

    let result = fixture
        .host
        .jobs()
        .ready(PollConfig::new().with_timeout(Duration::from_secs(10)))
        .await;
    assert_matches!(result, Err(HelperError::Timeout { .. }));

    let result = fixture
        .host
        .jobs()
        .wait_for("Job", PollConfig::new().with_timeout(Duration::from_secs(10)))
        .await;
    assert_matches!(result, Err(HelperError::Timeout { .. }));

    fixture
        .host
        .jobs()
        .terminate()
        .await?
        .ready(PollConfig::new().with_timeout(Duration::from_secs(10)))
        .await?;

    let unknown = fixture.engine.instance("u1").await;
    assert_eq!(unknown.map(|i| i.runtime_status), Some(RuntimeStatus::Terminated));
    assert_eq!(fixture.engine.calls().terminate, 1);
    Ok(())
}
