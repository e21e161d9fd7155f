//! Waiting for asynchronous cloud operations to settle

pub mod descriptor;
pub mod error;
pub mod prober;
pub mod reconciler;

pub use descriptor::{OperationDescriptor, StateClass};
pub use error::ReconcileError;
pub use prober::{PollResult, Refresh, StatusProber, DELETED};
pub use reconciler::{ProbeErrorPolicy, Reconciler};
