//! Testing utilities for durable orchestrations.
//!
//! This crate provides the test host around the durable helpers: explicit host
//! configuration, per-run hub naming, function manifest lookup, an HTTP
//! function host and its client, mocks of the engine boundary, stand-in HTTP
//! requests and assertion helpers.

pub mod assertions;
pub mod builders;
pub mod config;
pub mod error;
pub mod http;
pub mod http_host;
pub mod mocks;
pub mod server;

/// Re-export commonly used types for convenience
pub use mockall;

pub use builders::{find_functions_root, test_hub_name, TestHost, TestHostBuilder};
pub use config::{HostConfig, StorageConfig};
pub use error::TestHostError;
pub use http::{DummyHttpRequest, QueryCollection};
pub use http_host::HttpJobHost;
pub use server::{function_host_router, RunningFunctionHost};
