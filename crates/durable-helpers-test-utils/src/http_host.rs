use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use durable_helpers_core::{EngineError, FunctionArgs, HelperError, HelperResult, JobHost};

use crate::server::ErrorBody;

/// Job host that calls functions on a remote HTTP function host.
///
/// Error responses are turned back into the [`HelperError`] they were raised
/// as, so a chain over HTTP fails the same way as one in-process.
#[derive(Debug, Clone)]
pub struct HttpJobHost {
    client: Client,
    base_url: String,
}

impl HttpJobHost {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn function_url(&self, function: &str) -> String {
        format!("{}/admin/functions/{}", self.base_url, function)
    }
}

#[async_trait]
impl JobHost for HttpJobHost {
    async fn call(&self, function: &str, args: FunctionArgs) -> HelperResult<()> {
        let url = self.function_url(function);
        debug!(%url, "Calling remote function");

        let response = self
            .client
            .post(&url)
            .json(&args)
            .send()
            .await
            .map_err(|e| EngineError::Unreachable(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body: ErrorBody = response.json().await.map_err(|e| {
            HelperError::from(EngineError::Other(format!(
                "Unexpected {} response from {}: {}",
                status, url, e
            )))
        })?;

        Err(body.into_helper_error())
    }
}
