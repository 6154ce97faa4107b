//! Assertion utilities for orchestration instance snapshots.

mod instance_state;

pub use instance_state::*;
