//! Polling wait over a [`WaitCondition`].
//!
//! A wait moves from polling to either satisfied or cancelled. Each tick runs
//! one status query and evaluates the condition on the fresh snapshot; the
//! query and the sleep between ticks are both raced against the deadline and
//! the cancel token, so expiry is observed without waiting for the tick to end.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::client::JobsHandle;
use crate::error::{HelperError, HelperResult};
use crate::predicates::WaitCondition;
use crate::query::StatusQuery;
use crate::types::InstanceSummary;

/// Retry delay used when none is configured
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Timing of one wait call.
///
/// `None` means "not set" for both fields: no deadline for `timeout`, and
/// [`DEFAULT_RETRY_DELAY`] for `retry_delay`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Option<Duration>,
    pub retry_delay: Option<Duration>,
}

impl PollConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Fill unset fields from `defaults`.
    pub fn or(self, defaults: PollConfig) -> Self {
        Self {
            timeout: self.timeout.or(defaults.timeout),
            retry_delay: self.retry_delay.or(defaults.retry_delay),
        }
    }

    pub fn effective_retry_delay(&self) -> Duration {
        self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY)
    }
}

/// Cooperative cancellation shared between a waiter and whoever may stop it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                // sender lives as long as any token clone, including this one
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a satisfied wait
#[derive(Debug, Clone)]
pub struct WaitOutcome {
    /// Number of status queries issued
    pub polls: u32,
    pub elapsed: Duration,
    /// The snapshot the condition held on
    pub snapshot: Vec<InstanceSummary>,
}

/// Polls the engine until a condition holds, the deadline passes or the wait is cancelled.
///
/// Waiters only read, so any number of them may run against the same hub.
pub struct Waiter {
    handle: JobsHandle,
    condition: WaitCondition,
    config: PollConfig,
    query: Option<StatusQuery>,
    cancel: Option<CancelToken>,
}

impl Waiter {
    pub fn new(handle: JobsHandle, condition: WaitCondition) -> Self {
        Self {
            handle,
            condition,
            config: PollConfig::default(),
            query: None,
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    /// Poll this query instead of the condition's default one.
    pub fn with_query(mut self, query: StatusQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn wait(&self) -> HelperResult<WaitOutcome> {
        let retry_delay = self.config.effective_retry_delay();
        let query = self
            .query
            .clone()
            .unwrap_or_else(|| self.condition.default_query(&self.handle));

        let span = info_span!(
            "wait",
            condition = %self.condition.label(),
            hub = %self.handle.hub(),
            timeout_ms = ?self.config.timeout.map(|t| t.as_millis()),
            retry_delay_ms = retry_delay.as_millis() as u64,
        );

        self.poll(query, retry_delay).instrument(span).await
    }

    async fn poll(&self, query: StatusQuery, retry_delay: Duration) -> HelperResult<WaitOutcome> {
        let started = Instant::now();
        let deadline = self.config.timeout.map(|timeout| started + timeout);
        let mut polls = 0u32;

        loop {
            if self.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(self.timed_out(started));
            }

            let snapshot = tokio::select! {
                result = query.fetch() => result?,
                _ = interruption(deadline, self.cancel.as_ref()) => {
                    return Err(self.timed_out(started));
                }
            };
            polls += 1;

            if self.condition.is_satisfied(&snapshot) {
                info!(polls, elapsed_ms = started.elapsed().as_millis() as u64, "Wait condition satisfied");
                return Ok(WaitOutcome {
                    polls,
                    elapsed: started.elapsed(),
                    snapshot,
                });
            }

            debug!(poll = polls, pending = snapshot.len(), "Wait condition not yet satisfied");

            tokio::select! {
                _ = sleep(retry_delay) => {}
                _ = interruption(deadline, self.cancel.as_ref()) => {
                    return Err(self.timed_out(started));
                }
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn timed_out(&self, started: Instant) -> HelperError {
        let waited = started.elapsed();
        warn!(waited_ms = waited.as_millis() as u64, "Wait cancelled before condition held");
        HelperError::Timeout {
            condition: self.condition.label(),
            waited,
        }
    }
}

/// Resolves when the deadline passes or the token is cancelled, whichever comes first.
async fn interruption(deadline: Option<Instant>, cancel: Option<&CancelToken>) {
    let expiry = async {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = expiry => {}
        _ = cancelled => {}
    }
}

/// Wait for `condition` on the handle's hub with the given timing.
pub async fn wait_until(
    handle: &JobsHandle,
    condition: WaitCondition,
    config: PollConfig,
) -> HelperResult<WaitOutcome> {
    Waiter::new(handle.clone(), condition)
        .with_config(config)
        .wait()
        .await
}
