//! One observation of a remote object's status

use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

use crate::api::ApiError;

/// Status reported when the read function finds nothing
pub const DELETED: &str = "DELETED";

/// Outcome of a single probe
///
/// A probe *error* (network failure, 5xx) is carried in `error` and is
/// distinct from the object reporting an error *state* in `status`.
#[derive(Debug)]
pub struct PollResult<T> {
    pub object: Option<T>,
    pub status: String,
    pub error: Option<ApiError>,
}

impl<T> PollResult<T> {
    pub fn observed(object: T, status: impl Into<String>) -> Self {
        Self {
            object: Some(object),
            status: status.into(),
            error: None,
        }
    }

    /// A status seen without a readable object
    pub fn status_only(status: impl Into<String>) -> Self {
        Self {
            object: None,
            status: status.into(),
            error: None,
        }
    }

    pub fn deleted() -> Self {
        Self {
            object: None,
            status: DELETED.to_string(),
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            object: None,
            status: String::new(),
            error: Some(error),
        }
    }
}

/// Anything the reconciler can poll
#[async_trait]
pub trait Refresh: Send {
    type Object: Send + Debug;

    async fn refresh(&mut self) -> PollResult<Self::Object>;
}

/// Wraps a read function `id -> (object, status)` and maps not-found to
/// the `DELETED` status
pub struct StatusProber<F> {
    resource_id: String,
    read: F,
}

impl<F> StatusProber<F> {
    pub fn new(resource_id: impl Into<String>, read: F) -> Self {
        Self {
            resource_id: resource_id.into(),
            read,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

#[async_trait]
impl<F, Fut, T> Refresh for StatusProber<F>
where
    F: FnMut(String) -> Fut + Send,
    Fut: Future<Output = Result<(T, String), ApiError>> + Send,
    T: Send + Debug,
{
    type Object = T;

    async fn refresh(&mut self) -> PollResult<T> {
        match (self.read)(self.resource_id.clone()).await {
            Ok((object, status)) => {
                tracing::debug!("{} status: {}", self.resource_id, status);
                PollResult::observed(object, status)
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} not found, reporting {}", self.resource_id, DELETED);
                PollResult::deleted()
            }
            Err(e) => {
                tracing::debug!("probing {} failed: {}", self.resource_id, e);
                PollResult::failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_observed_status() {
        let mut prober = StatusProber::new("vpc-1", |id: String| async move {
            Ok::<_, ApiError>((format!("object {}", id), "OK".to_string()))
        });

        let result = prober.refresh().await;
        assert_eq!(result.status, "OK");
        assert_eq!(result.object.as_deref(), Some("object vpc-1"));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn not_found_becomes_deleted_without_error() {
        let mut prober = StatusProber::new("vpc-1", |id: String| async move {
            Err::<((), String), _>(ApiError::NotFound {
                path: format!("/vpcs/{}", id),
                details: None,
            })
        });

        let result = prober.refresh().await;
        assert_eq!(result.status, DELETED);
        assert!(result.object.is_none());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn other_errors_are_reported() {
        let mut prober = StatusProber::new("vpc-1", |_id: String| async move {
            Err::<((), String), _>(ApiError::ApiError {
                status: 500,
                message: "boom".to_string(),
                details: None,
            })
        });

        let result = prober.refresh().await;
        assert!(result.status.is_empty());
        assert_eq!(result.error.and_then(|e| e.status()), Some(500));
    }
}
