use std::time::Duration;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid operation descriptor for {resource_id}: {reason}")]
    InvalidDescriptor { resource_id: String, reason: String },

    #[error("{resource_id} reached error state '{state}', wanted '{target}'")]
    TerminalState {
        resource_id: String,
        state: String,
        target: String,
        /// Debug rendering of the object at the failing probe
        object: Option<String>,
    },

    #[error(
        "timeout while waiting for {resource_id} to become '{target}' (last state: '{}', timeout: {timeout:?})",
        .last_state.as_deref().unwrap_or("none")
    )]
    Timeout {
        resource_id: String,
        target: String,
        timeout: Duration,
        last_state: Option<String>,
        last_object: Option<String>,
        #[source]
        last_error: Option<ApiError>,
    },

    #[error("couldn't find resource {resource_id} ({checks} retries)")]
    NotFound { resource_id: String, checks: u32 },

    #[error("error waiting for {resource_id}: {source}")]
    Probe {
        resource_id: String,
        #[source]
        source: ApiError,
    },
}

impl ReconcileError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ReconcileError::Timeout { .. })
    }

    /// Human-readable detail for a diagnostic, including the last probe
    /// error a timeout carries
    pub fn detail(&self) -> String {
        match self {
            ReconcileError::Timeout {
                last_error: Some(e),
                ..
            } => format!("{}; last error: {}", self, e),
            ReconcileError::TerminalState {
                object: Some(object),
                ..
            } => format!("{}; object: {}", self, object),
            _ => self.to_string(),
        }
    }
}
