//! Helper functions callable by name through a [`JobHost`](crate::host::JobHost).
//!
//! Each wait and cleanup stage is exposed as a named function so it can be
//! triggered remotely, the same way a job host invokes any other function.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;

use crate::client::JobsHandle;
use crate::error::{HelperError, HelperResult};
use crate::predicates::WaitCondition;
use crate::reducers::{self, DEFAULT_TERMINATE_REASON};
use crate::waiter::{wait_until, PollConfig};

pub const READY_FUNCTION: &str = "ReadyFunction";
pub const WAIT_FOR_FUNCTION: &str = "WaitForFunction";
pub const THROW_IF_FAILED_FUNCTION: &str = "ThrowIfFailedFunction";
pub const PURGE_FUNCTION: &str = "PurgeFunction";
pub const TERMINATE_FUNCTION: &str = "TerminateFunction";
pub const WAIT_FOR_COMPLETION_FUNCTION: &str = "WaitForCompletion";

pub const ARG_NAME: &str = "name";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_RETRY_DELAY: &str = "retryDelay";
pub const ARG_REASON: &str = "reason";

/// Named JSON arguments of a function call.
///
/// Durations travel as integer milliseconds. Absent and `null` both mean unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionArgs(Map<String, Value>);

impl FunctionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with_duration(self, key: impl Into<String>, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.with(key, millis)
    }

    pub fn with_optional_duration(self, key: impl Into<String>, duration: Option<Duration>) -> Self {
        match duration {
            Some(duration) => self.with_duration(key, duration),
            None => self,
        }
    }

    /// Encode the set fields of a poll config.
    pub fn with_poll_config(self, config: PollConfig) -> Self {
        self.with_optional_duration(ARG_TIMEOUT, config.timeout)
            .with_optional_duration(ARG_RETRY_DELAY, config.retry_delay)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> HelperResult<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(HelperError::InvalidArgument(format!(
                "'{}' must be a string, got {}",
                key, other
            ))),
        }
    }

    pub fn require_str(&self, key: &str) -> HelperResult<&str> {
        self.get_str(key)?
            .ok_or_else(|| HelperError::InvalidArgument(format!("'{}' is required", key)))
    }

    pub fn get_duration(&self, key: &str) -> HelperResult<Option<Duration>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value.as_u64().map(Duration::from_millis).map(Some).ok_or_else(|| {
                HelperError::InvalidArgument(format!(
                    "'{}' must be a non-negative integer of milliseconds, got {}",
                    key, value
                ))
            }),
        }
    }

    pub fn poll_config(&self) -> HelperResult<PollConfig> {
        Ok(PollConfig {
            timeout: self.get_duration(ARG_TIMEOUT)?,
            retry_delay: self.get_duration(ARG_RETRY_DELAY)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What a function sees when it runs.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub handle: JobsHandle,
    /// Timing used where the call arguments leave it unset
    pub poll_defaults: PollConfig,
}

impl FunctionContext {
    pub fn new(handle: JobsHandle) -> Self {
        Self {
            handle,
            poll_defaults: PollConfig::default(),
        }
    }

    fn poll_config(&self, args: &FunctionArgs) -> HelperResult<PollConfig> {
        Ok(args.poll_config()?.or(self.poll_defaults))
    }
}

#[async_trait]
pub trait HelperFunction: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()>;
}

/// Waits until no instance in the hub is running. Args: `timeout`, `retryDelay`.
pub struct ReadyFunction;

#[async_trait]
impl HelperFunction for ReadyFunction {
    fn name(&self) -> &str {
        READY_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()> {
        let config = ctx.poll_config(args)?;
        wait_until(&ctx.handle, WaitCondition::Ready, config).await?;
        Ok(())
    }
}

/// Waits until no instance of `name` is running. Args: `name`, `timeout`, `retryDelay`.
pub struct WaitForFunction;

#[async_trait]
impl HelperFunction for WaitForFunction {
    fn name(&self) -> &str {
        WAIT_FOR_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()> {
        let name = args.require_str(ARG_NAME)?;
        let config = ctx.poll_config(args)?;
        wait_until(&ctx.handle, WaitCondition::done(name), config).await?;
        Ok(())
    }
}

pub struct ThrowIfFailedFunction;

#[async_trait]
impl HelperFunction for ThrowIfFailedFunction {
    fn name(&self) -> &str {
        THROW_IF_FAILED_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, _args: &FunctionArgs) -> HelperResult<()> {
        reducers::throw_if_failed(&ctx.handle).await
    }
}

pub struct PurgeFunction;

#[async_trait]
impl HelperFunction for PurgeFunction {
    fn name(&self) -> &str {
        PURGE_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, _args: &FunctionArgs) -> HelperResult<()> {
        reducers::purge(&ctx.handle).await?;
        Ok(())
    }
}

/// Args: optional `reason`.
pub struct TerminateFunction;

#[async_trait]
impl HelperFunction for TerminateFunction {
    fn name(&self) -> &str {
        TERMINATE_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()> {
        let reason = args.get_str(ARG_REASON)?.unwrap_or(DEFAULT_TERMINATE_REASON);
        reducers::terminate(&ctx.handle, reason).await?;
        Ok(())
    }
}

pub struct WaitForCompletionFunction;

#[async_trait]
impl HelperFunction for WaitForCompletionFunction {
    fn name(&self) -> &str {
        WAIT_FOR_COMPLETION_FUNCTION
    }

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()> {
        let config = ctx.poll_config(args)?;
        reducers::wait_for_orchestrations_completion(&ctx.handle, config).await
    }
}

/// A user function backed by an async closure, e.g. an orchestration starter.
pub struct FnFunction<F> {
    name: String,
    f: F,
}

impl<F> FnFunction<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F, Fut> HelperFunction for FnFunction<F>
where
    F: Fn(JobsHandle, FunctionArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HelperResult<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &FunctionContext, args: &FunctionArgs) -> HelperResult<()> {
        (self.f)(ctx.handle.clone(), args.clone()).await
    }
}
