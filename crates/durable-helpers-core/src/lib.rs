//!
//! Durable Helpers Core - waiting on and cleaning up durable orchestrations
//!
//! Integration tests start orchestrations and then need to know when they
//! have settled. This crate polls an orchestration engine for instance
//! status, waits until a condition holds, fails the test when an instance
//! failed, and terminates or purges what is left behind.

#![forbid(unsafe_code)]

/// Engine boundary and the per-hub handle
pub mod client;

/// Polling and logging configuration
pub mod config;

/// Error types
pub mod error;

/// Named helper functions
pub mod functions;

/// Hosts that call functions by name
pub mod host;

/// Fluent job chains
pub mod jobs;

/// Logging setup
pub mod logging;

/// Conditions over instance snapshots
pub mod predicates;

/// Status queries
pub mod query;

/// Assertions and cleanup over a hub
pub mod reducers;

/// Orchestration status types
pub mod types;

/// Deadline-bounded polling
pub mod waiter;

pub use client::{JobsHandle, OrchestrationClient};
pub use config::{LoggingConfig, PollDefaults};
pub use error::{AggregateFailure, EngineError, HelperError, HelperResult, InstanceFailure};
pub use functions::{FunctionArgs, FunctionContext, HelperFunction};
pub use host::{JobHost, LocalJobHost};
pub use jobs::Jobs;
pub use predicates::{is_done, is_empty, is_ready, WaitCondition};
pub use query::StatusQuery;
pub use reducers::{
    purge, terminate, throw_if_failed, wait_for_orchestrations_completion, PurgeReport,
    TerminateReport, DEFAULT_TERMINATE_REASON,
};
pub use types::{InstanceSummary, PurgeResult, RuntimeStatus, StatusFilter};
pub use waiter::{wait_until, CancelToken, PollConfig, WaitOutcome, Waiter, DEFAULT_RETRY_DELAY};
