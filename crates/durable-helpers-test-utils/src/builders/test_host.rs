//! TestHost builder for integration testing orchestrations.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use durable_helpers_core::{
    functions::FnFunction, logging, FunctionArgs, HelperError, HelperFunction, HelperResult, JobHost,
    Jobs, JobsHandle, LocalJobHost, OrchestrationClient,
};

use crate::config::HostConfig;
use crate::error::TestHostError;
use crate::server::{self, RunningFunctionHost};

const FUNCTION_MANIFEST: &str = "function.json";

/// Hub name unique to one test run: `test` followed by a `yyyyMMddTHHmmss` stamp.
pub fn test_hub_name(now: DateTime<Utc>) -> String {
    format!("test{}", now.format("%Y%m%dT%H%M%S"))
}

/// Locate the directory holding the function folders below `content_root`.
///
/// Searches depth-first, files before subdirectories and in name order, for the
/// first `function.json`, and returns the parent of the folder containing it.
pub fn find_functions_root(content_root: impl AsRef<Path>) -> HelperResult<PathBuf> {
    let content_root = content_root.as_ref();
    let manifest = find_manifest(content_root)?
        .ok_or_else(|| HelperError::ManifestNotFound(content_root.display().to_string()))?;

    let function_dir = manifest.parent().unwrap_or(content_root);
    Ok(function_dir.parent().unwrap_or(function_dir).to_path_buf())
}

fn find_manifest(dir: &Path) -> HelperResult<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    if let Some(manifest) = entries
        .iter()
        .find(|path| path.is_file() && path.file_name().map_or(false, |name| name == FUNCTION_MANIFEST))
    {
        return Ok(Some(manifest.clone()));
    }

    for subdir in entries.iter().filter(|path| path.is_dir()) {
        if let Some(manifest) = find_manifest(subdir)? {
            return Ok(Some(manifest));
        }
    }

    Ok(None)
}

type Connector = Box<dyn FnOnce(&HostConfig) -> Arc<dyn OrchestrationClient> + Send>;

/// Builder for a test host.
pub struct TestHostBuilder {
    config: HostConfig,
    client: Option<Arc<dyn OrchestrationClient>>,
    connector: Option<Connector>,
    functions: Vec<Arc<dyn HelperFunction>>,
    content_root: Option<PathBuf>,
}

impl Default for TestHostBuilder {
    fn default() -> Self {
        Self {
            config: HostConfig::default(),
            client: None,
            connector: None,
            functions: Vec::new(),
            content_root: None,
        }
    }
}

impl fmt::Debug for TestHostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestHostBuilder")
            .field("config", &self.config)
            .field("content_root", &self.content_root)
            .finish_non_exhaustive()
    }
}

impl TestHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hub_name(mut self, hub_name: impl Into<String>) -> Self {
        self.config.hub_name = hub_name.into();
        self
    }

    /// Use a hub named after the current time, so runs never share history.
    pub fn with_test_hub(self) -> Self {
        self.with_hub_name(test_hub_name(Utc::now()))
    }

    /// Use an already connected client; its hub overrides the configured one.
    pub fn with_client<C: OrchestrationClient + 'static>(mut self, client: C) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    pub fn with_shared_client(mut self, client: Arc<dyn OrchestrationClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Connect a client from the final config at build time.
    pub fn with_connector<F, C>(mut self, connect: F) -> Self
    where
        F: FnOnce(&HostConfig) -> C + Send + 'static,
        C: OrchestrationClient + 'static,
    {
        self.connector = Some(Box::new(move |config: &HostConfig| -> Arc<dyn OrchestrationClient> {
            Arc::new(connect(config))
        }));
        self
    }

    pub fn with_function<F: HelperFunction + 'static>(mut self, function: F) -> Self {
        self.functions.push(Arc::new(function));
        self
    }

    /// Register an async closure, e.g. an orchestration starter, under `name`.
    pub fn with_fn<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(JobsHandle, FunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HelperResult<()>> + Send + 'static,
    {
        self.functions.push(Arc::new(FnFunction::new(name, f)));
        self
    }

    /// Resolve `script_root` from a content root containing the functions.
    pub fn with_content_root(mut self, content_root: impl Into<PathBuf>) -> Self {
        self.content_root = Some(content_root.into());
        self
    }

    pub fn build(self) -> Result<TestHost, TestHostError> {
        let mut config = self.config;

        if let Some(content_root) = self.content_root {
            config.script_root = Some(find_functions_root(&content_root)?);
            if config.workers_directory.is_none() {
                config.workers_directory = Some(content_root);
            }
        }

        let client = match (self.client, self.connector) {
            (Some(client), _) => client,
            (None, Some(connect)) => connect(&config),
            (None, None) => return Err(TestHostError::MissingClient),
        };

        let handle = JobsHandle::new(client);
        if handle.hub() != config.hub_name {
            warn!(
                configured = %config.hub_name,
                client = %handle.hub(),
                "Client is bound to a different hub; using the client's"
            );
            config.hub_name = handle.hub().to_string();
        }

        let mut host = LocalJobHost::new(handle.clone()).with_poll_defaults(config.poll.to_poll_config());
        for function in self.functions {
            host = host.with_function(function);
        }

        info!(hub = %config.hub_name, functions = ?host.function_names(), "Test host ready");

        Ok(TestHost {
            config,
            handle,
            host: Arc::new(host),
        })
    }
}

/// A configured host: engine client, hub and function registry.
pub struct TestHost {
    config: HostConfig,
    handle: JobsHandle,
    host: Arc<LocalJobHost>,
}

impl fmt::Debug for TestHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestHost")
            .field("config", &self.config)
            .field("host", &self.host)
            .finish()
    }
}

impl TestHost {
    pub fn builder() -> TestHostBuilder {
        TestHostBuilder::new()
    }

    /// Jobs running in this process
    pub fn jobs(&self) -> Jobs {
        let host: Arc<dyn JobHost> = self.host.clone();
        Jobs::new(host)
    }

    pub fn handle(&self) -> &JobsHandle {
        &self.handle
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn job_host(&self) -> &Arc<LocalJobHost> {
        &self.host
    }

    /// Install the configured logging as the global subscriber.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        logging::init_logging(&self.config.logging)
    }

    /// Serve the function registry over HTTP on the configured port.
    pub async fn serve(&self) -> Result<RunningFunctionHost, TestHostError> {
        server::serve(self.host.clone(), self.config.port).await
    }
}
