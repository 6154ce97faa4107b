//! Mock implementation of the OrchestrationClient trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;

use durable_helpers_core::{
    EngineError, InstanceSummary, OrchestrationClient, PurgeResult, RuntimeStatus, StatusFilter,
};

// Generate the mock implementation
mock! {
    pub OrchestrationClient {}

    #[async_trait]
    impl OrchestrationClient for OrchestrationClient {
        fn task_hub_name(&self) -> &str;
        async fn list_instances(&self, filter: &StatusFilter) -> Result<Vec<InstanceSummary>, EngineError>;
        async fn terminate(&self, instance_id: &str, reason: &str) -> Result<(), EngineError>;
        async fn purge_history(
            &self,
            from: DateTime<Utc>,
            to: Option<DateTime<Utc>>,
            statuses: &[RuntimeStatus],
        ) -> Result<PurgeResult, EngineError>;
    }
}

/// Creates a mock client bound to `hub`. Other calls need expectations of their own.
pub fn create_mock_orchestration_client(hub: &str) -> MockOrchestrationClient {
    let mut mock = MockOrchestrationClient::new();
    mock.expect_task_hub_name().return_const(hub.to_string());
    mock
}

/// Creates a mock client whose every listing sees `instances`, filtered like a real engine would.
pub fn create_mock_client_with_instances(hub: &str, instances: Vec<InstanceSummary>) -> MockOrchestrationClient {
    let mut mock = create_mock_orchestration_client(hub);
    mock.expect_list_instances().returning(move |filter| {
        Ok(instances
            .iter()
            .filter(|instance| filter.matches(instance))
            .cloned()
            .collect())
    });
    mock
}
