//! Fluent composition of waits and cleanup stages.
//!
//! ```ignore
//! jobs.wait_for("Job", PollConfig::new().with_timeout(Duration::from_secs(20)))
//!     .await?
//!     .throw_if_failed()
//!     .await?
//!     .purge()
//!     .await?;
//! ```
//!
//! Every stage consumes the context and returns it for the next one. An error
//! from any stage ends the chain.

use std::fmt;
use std::sync::Arc;

use crate::client::JobsHandle;
use crate::error::HelperResult;
use crate::functions::{
    FunctionArgs, ARG_NAME, ARG_REASON, PURGE_FUNCTION, READY_FUNCTION, TERMINATE_FUNCTION,
    THROW_IF_FAILED_FUNCTION, WAIT_FOR_COMPLETION_FUNCTION, WAIT_FOR_FUNCTION,
};
use crate::host::{JobHost, LocalJobHost};
use crate::waiter::PollConfig;

#[derive(Clone)]
pub struct Jobs {
    host: Arc<dyn JobHost>,
}

impl Jobs {
    pub fn new(host: Arc<dyn JobHost>) -> Self {
        Self { host }
    }

    /// Jobs backed by an in-process host with the builtin functions.
    pub fn local(handle: JobsHandle) -> Self {
        Self::new(Arc::new(LocalJobHost::new(handle)))
    }

    pub fn host(&self) -> &Arc<dyn JobHost> {
        &self.host
    }

    /// Call any function registered on the host.
    pub async fn call(self, function: &str, args: FunctionArgs) -> HelperResult<Self> {
        self.host.call(function, args).await?;
        Ok(self)
    }

    /// Wait until nothing in the hub is running.
    pub async fn ready(self, config: PollConfig) -> HelperResult<Self> {
        self.call(READY_FUNCTION, FunctionArgs::new().with_poll_config(config))
            .await
    }

    /// Wait until no instance of the orchestration `name` is running.
    pub async fn wait_for(self, name: &str, config: PollConfig) -> HelperResult<Self> {
        let args = FunctionArgs::new().with(ARG_NAME, name).with_poll_config(config);
        self.call(WAIT_FOR_FUNCTION, args).await
    }

    pub async fn throw_if_failed(self) -> HelperResult<Self> {
        self.call(THROW_IF_FAILED_FUNCTION, FunctionArgs::new()).await
    }

    pub async fn purge(self) -> HelperResult<Self> {
        self.call(PURGE_FUNCTION, FunctionArgs::new()).await
    }

    pub async fn terminate(self) -> HelperResult<Self> {
        self.call(TERMINATE_FUNCTION, FunctionArgs::new()).await
    }

    pub async fn terminate_with_reason(self, reason: &str) -> HelperResult<Self> {
        self.call(TERMINATE_FUNCTION, FunctionArgs::new().with(ARG_REASON, reason))
            .await
    }

    pub async fn wait_for_orchestrations_completion(self, config: PollConfig) -> HelperResult<Self> {
        self.call(
            WAIT_FOR_COMPLETION_FUNCTION,
            FunctionArgs::new().with_poll_config(config),
        )
        .await
    }
}

impl fmt::Debug for Jobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jobs").finish_non_exhaustive()
    }
}
