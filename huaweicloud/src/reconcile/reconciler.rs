//! Polls a resource until it reaches a target state, an error state, or
//! the wait times out.

use std::time::Duration;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

use super::descriptor::{OperationDescriptor, StateClass};
use super::error::ReconcileError;
use super::prober::{Refresh, DELETED};
use crate::api::ApiError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// How probe errors (not error *states*) are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeErrorPolicy {
    /// Every probe error is retried until the deadline
    #[default]
    Transient,
    /// Only errors `ApiError::is_retryable` accepts are retried
    RetryableOnly,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    pub delay: Duration,
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Consecutive target observations required before success
    pub continuous_target_occurrence: u32,
    /// Consecutive `DELETED` observations tolerated while `DELETED` is
    /// not an expected state
    pub not_found_checks: u32,
    pub error_policy: ProbeErrorPolicy,
}

impl Reconciler {
    pub fn new(timeout: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout,
            continuous_target_occurrence: 1,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            error_policy: ProbeErrorPolicy::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_continuous_target_occurrence(mut self, count: u32) -> Self {
        self.continuous_target_occurrence = count.max(1);
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn with_error_policy(mut self, policy: ProbeErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    fn is_fatal(&self, error: &ApiError) -> bool {
        match self.error_policy {
            ProbeErrorPolicy::Transient => false,
            ProbeErrorPolicy::RetryableOnly => !error.is_retryable(),
        }
    }

    /// Waits for `descriptor`'s target, returning the object from the
    /// final probe (`None` when the target is `DELETED`).
    ///
    /// The first probe happens after `delay`, later probes `poll_interval`
    /// apart. No sleep extends past `timeout`.
    pub async fn wait<R>(
        &self,
        descriptor: &OperationDescriptor,
        refresh: &mut R,
    ) -> Result<Option<R::Object>, ReconcileError>
    where
        R: Refresh + ?Sized,
    {
        descriptor.validate()?;

        let resource_id = descriptor.resource_id();
        let deadline = Instant::now() + self.timeout;
        let mut next_wait = self.delay;

        let mut target_seen = 0u32;
        let mut not_found_seen = 0u32;
        let mut last_state: Option<String> = None;
        let mut last_object: Option<String> = None;
        let mut last_error: Option<ApiError> = None;

        let timed_out = |last_state: Option<String>,
                         last_object: Option<String>,
                         last_error: Option<ApiError>| {
            ReconcileError::Timeout {
                resource_id: resource_id.to_string(),
                target: descriptor.target_label(),
                timeout: self.timeout,
                last_state,
                last_object,
                last_error,
            }
        };

        debug!(
            "waiting for {} to become '{}' (timeout {:?})",
            resource_id,
            descriptor.target_label(),
            self.timeout
        );

        loop {
            if !next_wait.is_zero() {
                if Instant::now() + next_wait > deadline {
                    sleep_until(deadline).await;
                    return Err(timed_out(last_state, last_object, last_error));
                }
                sleep(next_wait).await;
            }
            next_wait = self.poll_interval;

            let result = match timeout_at(deadline, refresh.refresh()).await {
                Ok(result) => result,
                Err(_) => return Err(timed_out(last_state, last_object, last_error)),
            };

            if let Some(error) = result.error {
                if self.is_fatal(&error) {
                    return Err(ReconcileError::Probe {
                        resource_id: resource_id.to_string(),
                        source: error,
                    });
                }
                warn!("transient error probing {}: {}", resource_id, error);
                target_seen = 0;
                last_error = Some(error);
                continue;
            }

            let status = result.status;
            if last_state.as_deref() != Some(status.as_str()) {
                info!("{} is now '{}'", resource_id, status);
            }

            match descriptor.classify(&status) {
                StateClass::Target => {
                    not_found_seen = 0;
                    target_seen += 1;
                    if target_seen >= self.continuous_target_occurrence {
                        return Ok(result.object);
                    }
                }
                StateClass::Error => {
                    return Err(ReconcileError::TerminalState {
                        resource_id: resource_id.to_string(),
                        state: status,
                        target: descriptor.target_label(),
                        object: result.object.as_ref().map(|o| format!("{:?}", o)),
                    });
                }
                StateClass::Pending => {
                    target_seen = 0;
                    not_found_seen = 0;
                }
                StateClass::Unrecognized if status == DELETED => {
                    target_seen = 0;
                    not_found_seen += 1;
                    if not_found_seen > self.not_found_checks {
                        return Err(ReconcileError::NotFound {
                            resource_id: resource_id.to_string(),
                            checks: not_found_seen,
                        });
                    }
                }
                StateClass::Unrecognized => {
                    target_seen = 0;
                    not_found_seen = 0;
                    warn!(
                        "{} reported unexpected state '{}', still waiting",
                        resource_id, status
                    );
                }
            }

            last_object = result.object.as_ref().map(|o| format!("{:?}", o));
            last_state = Some(status);
        }
    }
}
