//! Timing and predicate properties of the waiter, on the paused Tokio clock.

use assert_matches::assert_matches;
use durable_helpers_core::{
    is_done, is_ready, CancelToken, HelperError, InstanceSummary, PollConfig, RuntimeStatus,
    WaitCondition, Waiter,
};
use durable_helpers_inmemory::OrchestrationScript;
use durable_helpers_tests::Fixture;
use std::time::Duration;
use tokio::time::Instant;

const ALL_STATUSES: [RuntimeStatus; 8] = [
    RuntimeStatus::Pending,
    RuntimeStatus::Running,
    RuntimeStatus::ContinuedAsNew,
    RuntimeStatus::Completed,
    RuntimeStatus::Failed,
    RuntimeStatus::Terminated,
    RuntimeStatus::Canceled,
    RuntimeStatus::Unknown,
];

fn snapshot(statuses: &[RuntimeStatus]) -> Vec<InstanceSummary> {
    statuses
        .iter()
        .enumerate()
        .map(|(i, status)| InstanceSummary::new(i.to_string(), "Job", "hub", *status))
        .collect()
}

#[test]
fn test_readiness_over_every_pair_of_statuses() {
    for a in ALL_STATUSES {
        for b in ALL_STATUSES {
            let set = snapshot(&[a, b]);
            assert_eq!(
                is_ready(&set),
                a.is_terminal() && b.is_terminal(),
                "is_ready({}, {})",
                a,
                b
            );
        }
    }
    assert!(is_ready(&[]));
}

#[test]
fn test_done_ignores_other_orchestrations() {
    let mut set = snapshot(&[RuntimeStatus::Completed]);
    set.push(InstanceSummary::new("x", "Other", "hub", RuntimeStatus::Running));

    assert!(is_done("Job", &set));
    assert!(!is_done("Other", &set));
    assert!(is_done("NeverStarted", &set));
}

#[tokio::test(start_paused = true)]
async fn test_satisfied_first_poll_does_not_sleep() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.client.insert("1", "Job", RuntimeStatus::Completed).await;

    let started = Instant::now();
    let outcome = Waiter::new(fixture.host.handle().clone(), WaitCondition::Ready)
        .with_config(PollConfig::new().with_timeout(Duration::from_secs(20)))
        .wait()
        .await?;

    assert_eq!(outcome.polls, 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_timeout_lands_within_one_retry_delay() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.start("Job", OrchestrationScript::runs_until_terminated()).await?;

    for (timeout, retry_delay) in [(20_000, 5_000), (1_000, 300), (250, 1_000)] {
        let timeout = Duration::from_millis(timeout);
        let retry_delay = Duration::from_millis(retry_delay);

        let started = Instant::now();
        let result = Waiter::new(fixture.host.handle().clone(), WaitCondition::Ready)
            .with_config(PollConfig::new().with_timeout(timeout).with_retry_delay(retry_delay))
            .wait()
            .await;
        let elapsed = started.elapsed();

        assert_matches!(result, Err(HelperError::Timeout { .. }));
        assert!(elapsed >= timeout, "{:?} < {:?}", elapsed, timeout);
        assert!(elapsed < timeout + retry_delay, "{:?} >= {:?} + {:?}", elapsed, timeout, retry_delay);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_an_unbounded_wait() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.start("Job", OrchestrationScript::runs_until_terminated()).await?;

    let token = CancelToken::new();
    let waiter = Waiter::new(fixture.host.handle().clone(), WaitCondition::done("Job")).with_cancel(token.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = waiter.wait().await;

    assert_matches!(result, Err(HelperError::Timeout { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(12));
    canceller.await?;

    let job = fixture.engine.instances().await;
    assert_eq!(job[0].runtime_status, RuntimeStatus::Running);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_custom_condition_over_full_snapshot() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    for _ in 0..3 {
        fixture
            .start("Job", OrchestrationScript::completes_after(Duration::from_secs(1), "done"))
            .await?;
    }

    let condition = WaitCondition::custom("three completed jobs", |instances: &[InstanceSummary]| {
        instances
            .iter()
            .filter(|i| i.runtime_status == RuntimeStatus::Completed)
            .count()
            == 3
    });
    let outcome = Waiter::new(fixture.host.handle().clone(), condition)
        .with_config(PollConfig::new().with_retry_delay(Duration::from_millis(500)))
        .wait()
        .await?;

    assert_eq!(outcome.snapshot.len(), 3);
    assert!((3..=4).contains(&outcome.polls), "polls = {}", outcome.polls);
    Ok(())
}
