use std::collections::BTreeSet;

use super::error::ReconcileError;

/// What a status string means to one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Pending,
    Target,
    Error,
    Unrecognized,
}

/// The states one asynchronous operation moves through
///
/// ```ignore
/// let op = OperationDescriptor::new(&subnet_id)
///     .pending(["UNKNOWN"])
///     .target(["ACTIVE"])
///     .error(["ERROR", "DOWN"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    resource_id: String,
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    error: BTreeSet<String>,
}

impl OperationDescriptor {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            error: BTreeSet::new(),
        }
    }

    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn error<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.error.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Target states joined for messages, e.g. "ACTIVE" or "DELETED, OK"
    pub fn target_label(&self) -> String {
        self.target.iter().cloned().collect::<Vec<_>>().join(", ")
    }

    /// Rejects descriptors with no target or with a state in two sets
    pub fn validate(&self) -> Result<(), ReconcileError> {
        let invalid = |reason: String| ReconcileError::InvalidDescriptor {
            resource_id: self.resource_id.clone(),
            reason,
        };

        if self.target.is_empty() {
            return Err(invalid("no target states".to_string()));
        }

        let sets = [
            ("pending", &self.pending),
            ("target", &self.target),
            ("error", &self.error),
        ];
        for (i, (name_a, a)) in sets.iter().enumerate() {
            for (name_b, b) in &sets[i + 1..] {
                if let Some(state) = a.intersection(b).next() {
                    return Err(invalid(format!(
                        "state '{}' is both {} and {}",
                        state, name_a, name_b
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn classify(&self, status: &str) -> StateClass {
        if self.target.contains(status) {
            StateClass::Target
        } else if self.error.contains(status) {
            StateClass::Error
        } else if self.pending.contains(status) {
            StateClass::Pending
        } else {
            StateClass::Unrecognized
        }
    }
}
