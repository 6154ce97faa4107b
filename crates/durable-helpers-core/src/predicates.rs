//! Predicates evaluated over a snapshot of instances.
//!
//! All predicates are pure and are re-evaluated on a fresh snapshot every
//! poll tick. They never depend on the order of the snapshot.

use std::fmt;
use std::sync::Arc;

use crate::client::JobsHandle;
use crate::query::StatusQuery;
use crate::types::InstanceSummary;

/// True iff the set is empty or every member is terminal.
///
/// An empty set counts as ready: entity-driven orchestrations may have been
/// purged already by the time anyone looks.
pub fn is_ready(instances: &[InstanceSummary]) -> bool {
    instances.iter().all(InstanceSummary::is_terminal)
}

/// True iff no instance named `name` is still non-terminal.
///
/// An absent instance also satisfies this. "Completed and purged" and "not
/// started yet" look the same to a status query, so a wait issued before the
/// engine has registered the instance returns immediately.
pub fn is_done(name: &str, instances: &[InstanceSummary]) -> bool {
    instances
        .iter()
        .filter(|instance| instance.name == name)
        .all(InstanceSummary::is_terminal)
}

/// True iff the set has no members at all.
pub fn is_empty(instances: &[InstanceSummary]) -> bool {
    instances.is_empty()
}

pub type InstancePredicate = Arc<dyn Fn(&[InstanceSummary]) -> bool + Send + Sync>;

/// A predicate plus the name it is reported under.
#[derive(Clone)]
pub enum WaitCondition {
    /// Every instance in the hub is terminal
    Ready,
    /// No instance of the named orchestration is still running
    Done { name: String },
    /// The query returns nothing at all
    Empty,
    Custom { label: String, predicate: InstancePredicate },
}

impl WaitCondition {
    pub fn done(name: impl Into<String>) -> Self {
        WaitCondition::Done { name: name.into() }
    }

    pub fn custom<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&[InstanceSummary]) -> bool + Send + Sync + 'static,
    {
        WaitCondition::Custom {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn label(&self) -> String {
        match self {
            WaitCondition::Ready => "readiness".to_string(),
            WaitCondition::Done { name } => format!("completion of '{}'", name),
            WaitCondition::Empty => "no instances".to_string(),
            WaitCondition::Custom { label, .. } => label.clone(),
        }
    }

    pub fn is_satisfied(&self, instances: &[InstanceSummary]) -> bool {
        match self {
            WaitCondition::Ready => is_ready(instances),
            WaitCondition::Done { name } => is_done(name, instances),
            WaitCondition::Empty => is_empty(instances),
            WaitCondition::Custom { predicate, .. } => predicate(instances),
        }
    }

    /// The query polled for this condition when the caller does not supply one.
    ///
    /// `Ready` and `Done` only need the instances that are still running.
    pub fn default_query(&self, handle: &JobsHandle) -> StatusQuery {
        match self {
            WaitCondition::Ready | WaitCondition::Done { .. } => handle.query().non_terminal(),
            WaitCondition::Empty | WaitCondition::Custom { .. } => handle.query(),
        }
    }
}

impl fmt::Debug for WaitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WaitCondition").field(&self.label()).finish()
    }
}
