//! Shared fixtures for the durable helpers scenarios.
//!
//! Every fixture runs against its own in-memory engine and a hub named after
//! the time of the run, the way a test suite gets a fresh task hub per run.

use std::time::Duration;

use durable_helpers_core::{FunctionArgs, HelperError, HelperResult, PollConfig};
use durable_helpers_inmemory::{InMemoryClient, InMemoryEngine, OrchestrationScript};
use durable_helpers_test_utils::{HostConfig, TestHost, TestHostBuilder};

/// Function that starts one scripted orchestration. Args: `name`, `script`.
pub const STARTER_FUNCTION: &str = "DemoStarter";

pub struct Fixture {
    pub engine: InMemoryEngine,
    pub client: InMemoryClient,
    pub host: TestHost,
}

impl Fixture {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(HostConfig::default())
    }

    pub fn with_config(config: HostConfig) -> anyhow::Result<Self> {
        durable_helpers_core::logging::init_test_tracing();

        let engine = InMemoryEngine::new();
        let connect = engine.clone();
        let host = TestHostBuilder::new()
            .with_config(config)
            .with_test_hub()
            .with_connector(move |config| connect.client(config.hub_name.clone()))
            .with_fn(STARTER_FUNCTION, {
                let engine = engine.clone();
                move |handle, args| {
                    let engine = engine.clone();
                    async move { start_from_args(&engine, handle.hub(), &args).await }
                }
            })
            .build()?;

        let client = engine.client(host.handle().hub());
        Ok(Self { engine, client, host })
    }

    /// Start `name` in the fixture's hub.
    pub async fn start(&self, name: &str, script: OrchestrationScript) -> anyhow::Result<String> {
        Ok(self.client.start_orchestration(name, script).await?)
    }
}

async fn start_from_args(engine: &InMemoryEngine, hub: &str, args: &FunctionArgs) -> HelperResult<()> {
    let name = args.require_str("name")?;
    let script = match args.get("script") {
        Some(script) => serde_json::from_value(script.clone())
            .map_err(|e| HelperError::InvalidArgument(format!("'script' is not a valid script: {}", e)))?,
        None => OrchestrationScript::runs_until_terminated(),
    };

    let instance_id = engine.start_orchestration(hub, name, None, script).await?;
    tracing::info!(%instance_id, name, "Demo starter started orchestration");
    Ok(())
}

/// Arguments for [`STARTER_FUNCTION`].
pub fn starter_args(name: &str, script: &OrchestrationScript) -> anyhow::Result<FunctionArgs> {
    Ok(FunctionArgs::new()
        .with("name", name)
        .with("script", serde_json::to_value(script)?))
}

/// Poll timing for tests on the real clock.
pub fn fast_poll(timeout: Duration) -> PollConfig {
    PollConfig::new()
        .with_timeout(timeout)
        .with_retry_delay(Duration::from_millis(20))
}
