pub mod client;
pub mod common;
pub mod ecs;
pub mod error;
pub mod signer;
pub mod vpc;

pub use client::{Client, RetryConfig};
pub use error::ApiError;
