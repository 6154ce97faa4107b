//! Environment setup builders for testing orchestrations.
//!
//! This module provides the builder for a test host: an orchestration client,
//! the hub it is scoped to and the functions that can be called on it.

mod test_host;

pub use test_host::*;
