//! In-memory orchestration engine for the durable helpers
//!
//! Implements the engine boundary from `durable-helpers-core` over a shared
//! in-process store. Instances are either inserted directly or started from a
//! script that walks them through their lifecycle on Tokio tasks, so waits,
//! terminates and purges can be exercised without a real engine.

pub mod engine;
pub use engine::{CallCounts, InMemoryClient, InMemoryEngine};

pub mod script;
pub use script::{OrchestrationScript, ScriptStep};
