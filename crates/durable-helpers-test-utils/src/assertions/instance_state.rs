//! Assertion utilities for validating orchestration instance snapshots.

use durable_helpers_core::{InstanceSummary, RuntimeStatus};
use serde_json::Value;
use thiserror::Error;

/// Error type for instance validation failures
#[derive(Debug, Error, PartialEq)]
pub enum InstanceAssertionError {
    #[error("Invalid runtime status for {instance_id}: expected {expected}, got {actual}")]
    InvalidStatus {
        instance_id: String,
        expected: RuntimeStatus,
        actual: RuntimeStatus,
    },

    #[error("Output mismatch for {instance_id}: expected {expected}, got {actual}")]
    OutputMismatch {
        instance_id: String,
        expected: String,
        actual: String,
    },

    #[error("Orchestration name mismatch: expected {expected}, got {actual}")]
    NameMismatch { expected: String, actual: String },

    #[error("Instance not found: {0}")]
    NotFound(String),

    #[error("Expected {expected} instance(s), found {actual}")]
    UnexpectedCount { expected: usize, actual: usize },

    #[error("Instance {instance_id} is still {status}")]
    NotTerminal {
        instance_id: String,
        status: RuntimeStatus,
    },
}

/// Asserts that an instance has the expected runtime status.
pub fn assert_runtime_status(
    instance: &InstanceSummary,
    expected: RuntimeStatus,
) -> Result<(), InstanceAssertionError> {
    if instance.runtime_status != expected {
        return Err(InstanceAssertionError::InvalidStatus {
            instance_id: instance.instance_id.clone(),
            expected,
            actual: instance.runtime_status,
        });
    }

    Ok(())
}

/// Asserts that an instance carries exactly the expected output.
pub fn assert_output(instance: &InstanceSummary, expected: &Value) -> Result<(), InstanceAssertionError> {
    let actual = instance.output.as_ref().unwrap_or(&Value::Null);
    if actual != expected {
        return Err(InstanceAssertionError::OutputMismatch {
            instance_id: instance.instance_id.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    Ok(())
}

/// Asserts that an instance failed and that its output reads `message`.
pub fn assert_failed_with(instance: &InstanceSummary, message: &str) -> Result<(), InstanceAssertionError> {
    assert_runtime_status(instance, RuntimeStatus::Failed)?;

    let actual = instance.output_message();
    if actual != message {
        return Err(InstanceAssertionError::OutputMismatch {
            instance_id: instance.instance_id.clone(),
            expected: message.to_string(),
            actual,
        });
    }

    Ok(())
}

pub fn assert_name(instance: &InstanceSummary, expected: &str) -> Result<(), InstanceAssertionError> {
    if instance.name != expected {
        return Err(InstanceAssertionError::NameMismatch {
            expected: expected.to_string(),
            actual: instance.name.clone(),
        });
    }

    Ok(())
}

/// Asserts that every instance of the snapshot has reached a terminal status.
pub fn assert_all_terminal(instances: &[InstanceSummary]) -> Result<(), InstanceAssertionError> {
    match instances.iter().find(|instance| !instance.is_terminal()) {
        Some(instance) => Err(InstanceAssertionError::NotTerminal {
            instance_id: instance.instance_id.clone(),
            status: instance.runtime_status,
        }),
        None => Ok(()),
    }
}

pub fn assert_instance_count(instances: &[InstanceSummary], expected: usize) -> Result<(), InstanceAssertionError> {
    if instances.len() != expected {
        return Err(InstanceAssertionError::UnexpectedCount {
            expected,
            actual: instances.len(),
        });
    }

    Ok(())
}

/// Finds an instance by id in a snapshot.
pub fn find_instance<'a>(
    instances: &'a [InstanceSummary],
    instance_id: &str,
) -> Result<&'a InstanceSummary, InstanceAssertionError> {
    instances
        .iter()
        .find(|instance| instance.instance_id == instance_id)
        .ok_or_else(|| InstanceAssertionError::NotFound(instance_id.to_string()))
}
