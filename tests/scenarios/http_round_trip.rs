//! The helper chain driven over HTTP against a served test host.

use assert_matches::assert_matches;
use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    routing::post,
    Router,
};
use durable_helpers_core::{FunctionArgs, HelperError, InstanceSummary, RuntimeStatus};
use durable_helpers_inmemory::{InMemoryClient, OrchestrationScript};
use durable_helpers_test_utils::DummyHttpRequest;
use durable_helpers_tests::{fast_poll, starter_args, Fixture, STARTER_FUNCTION};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tower::ServiceExt;

#[tokio::test]
async fn test_chain_over_http() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let running = fixture.host.serve().await?;

    let script = OrchestrationScript::completes_after(Duration::from_millis(100), "done");
    running
        .jobs()
        .call(STARTER_FUNCTION, starter_args("Job", &script)?)
        .await?
        .wait_for("Job", fast_poll(Duration::from_secs(5)))
        .await?
        .throw_if_failed()
        .await?
        .purge()
        .await?;

    assert!(fixture.engine.instances().await.is_empty());
    running.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_failures_keep_their_kind_over_http() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let running = fixture.host.serve().await?;

    fixture
        .engine
        .insert_instance(
            InstanceSummary::new("f1", "Job", fixture.host.handle().hub(), RuntimeStatus::Failed)
                .with_output(json!("boom")),
        )
        .await;

    let result = running.jobs().throw_if_failed().await;
    let failure = assert_matches!(result, Err(HelperError::Failed(failure)) => failure);
    assert_eq!(failure.messages(), vec!["boom"]);

    let result = running.jobs().call("NoSuchFunction", FunctionArgs::new()).await;
    assert_matches!(result, Err(HelperError::FunctionNotFound(name)) if name == "NoSuchFunction");

    let result = running.jobs().call(STARTER_FUNCTION, FunctionArgs::new()).await;
    assert_matches!(result, Err(HelperError::InvalidArgument(_)));

    running.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_timeout_over_http() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    fixture.start("Job", OrchestrationScript::runs_until_terminated()).await?;
    let running = fixture.host.serve().await?;

    let result = running
        .jobs()
        .wait_for("Job", fast_poll(Duration::from_millis(200)))
        .await;
    assert_matches!(
        result,
        Err(HelperError::Timeout { condition, waited })
            if condition == "completion of 'Job'" && waited >= Duration::from_millis(200)
    );

    running.jobs().terminate().await?.purge().await?;
    assert!(fixture.engine.instances().await.is_empty());

    running.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_health() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let running = fixture.host.serve().await?;

    let response = reqwest::get(format!("{}/health", running.base_url)).await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await?, "OK");

    running.stop().await?;
    Ok(())
}

async fn start_job(
    State(client): State<InMemoryClient>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<(StatusCode, String), StatusCode> {
    let name = params.get("name").ok_or(StatusCode::BAD_REQUEST)?;
    let millis = params
        .get("millis")
        .map(|m| m.parse::<u64>())
        .transpose()
        .map_err(|_| StatusCode::BAD_REQUEST)?
        .unwrap_or(50);

    let id = client
        .start_orchestration(name, OrchestrationScript::completes_after(Duration::from_millis(millis), "done"))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((StatusCode::ACCEPTED, id))
}

#[tokio::test]
async fn test_dummy_request_drives_a_starter_endpoint() -> anyhow::Result<()> {
    let fixture = Fixture::new()?;
    let app = Router::new()
        .route("/api/start", post(start_job))
        .with_state(fixture.client.clone());

    let request = DummyHttpRequest::new()
        .method(Method::POST)
        .path("api/start")
        .query_param("name", "Report Job")
        .query_param("millis", "30")
        .into_request()?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let bad = DummyHttpRequest::new()
        .method(Method::POST)
        .path("/api/start")
        .query_param("millis", "soon")
        .into_request()?;
    assert_eq!(app.oneshot(bad).await?.status(), StatusCode::BAD_REQUEST);

    fixture
        .host
        .jobs()
        .wait_for("Report Job", fast_poll(Duration::from_secs(5)))
        .await?
        .throw_if_failed()
        .await?;

    let instances = fixture.engine.instances().await;
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name, "Report Job");
    assert_eq!(instances[0].runtime_status, RuntimeStatus::Completed);
    Ok(())
}
