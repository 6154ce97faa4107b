//! Job hosts: where helper functions are invoked by name.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use crate::client::JobsHandle;
use crate::error::{HelperError, HelperResult};
use crate::functions::{
    FnFunction, FunctionArgs, FunctionContext, HelperFunction, PurgeFunction, ReadyFunction,
    TerminateFunction, ThrowIfFailedFunction, WaitForCompletionFunction, WaitForFunction,
};
use crate::waiter::PollConfig;

/// Invokes functions by name. This is the `callActivity` boundary.
#[async_trait]
pub trait JobHost: Send + Sync {
    async fn call(&self, function: &str, args: FunctionArgs) -> HelperResult<()>;
}

/// The helper functions every host registers.
pub fn builtin_functions() -> Vec<Arc<dyn HelperFunction>> {
    vec![
        Arc::new(ReadyFunction),
        Arc::new(WaitForFunction),
        Arc::new(ThrowIfFailedFunction),
        Arc::new(PurgeFunction),
        Arc::new(TerminateFunction),
        Arc::new(WaitForCompletionFunction),
    ]
}

/// In-process job host with a fixed function registry.
pub struct LocalJobHost {
    ctx: FunctionContext,
    functions: HashMap<String, Arc<dyn HelperFunction>>,
}

impl LocalJobHost {
    /// Creates a host with the builtin helper functions registered.
    pub fn new(handle: JobsHandle) -> Self {
        let mut host = Self {
            ctx: FunctionContext::new(handle),
            functions: HashMap::new(),
        };
        for function in builtin_functions() {
            host.register(function);
        }
        host
    }

    pub fn with_poll_defaults(mut self, defaults: PollConfig) -> Self {
        self.ctx.poll_defaults = defaults;
        self
    }

    /// Registers a function, replacing any with the same name.
    pub fn with_function(mut self, function: Arc<dyn HelperFunction>) -> Self {
        self.register(function);
        self
    }

    /// Registers an async closure under `name`.
    pub fn with_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(JobsHandle, FunctionArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HelperResult<()>> + Send + 'static,
    {
        self.with_function(Arc::new(FnFunction::new(name, f)))
    }

    fn register(&mut self, function: Arc<dyn HelperFunction>) {
        self.functions.insert(function.name().to_string(), function);
    }

    pub fn handle(&self) -> &JobsHandle {
        &self.ctx.handle
    }

    pub fn poll_defaults(&self) -> PollConfig {
        self.ctx.poll_defaults
    }

    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for LocalJobHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalJobHost")
            .field("hub", &self.ctx.handle.hub())
            .field("functions", &self.function_names())
            .finish()
    }
}

#[async_trait]
impl JobHost for LocalJobHost {
    async fn call(&self, function: &str, args: FunctionArgs) -> HelperResult<()> {
        let target = self
            .functions
            .get(function)
            .ok_or_else(|| HelperError::FunctionNotFound(function.to_string()))?;

        let span = info_span!("call", function, hub = %self.ctx.handle.hub());
        async {
            info!("Calling function");
            target.run(&self.ctx, &args).await
        }
        .instrument(span)
        .await
    }
}
