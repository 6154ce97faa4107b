//! Mock implementations of the engine boundary.

pub mod engine_client;

pub use engine_client::*;
