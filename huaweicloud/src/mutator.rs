//! Create, read, update and delete wrappers that make repeated calls safe

use std::future::Future;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tracing::{debug, info};

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome<T> {
    Found(T),
    Gone,
}

impl<T> ReadOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            ReadOutcome::Found(object) => Some(object),
            ReadOutcome::Gone => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome<T> {
    Created(T),
    Existing(T),
}

impl<T> CreateOutcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            CreateOutcome::Created(object) | CreateOutcome::Existing(object) => object,
        }
    }
}

/// Runs `delete`, treating not-found as success
pub async fn delete_idempotent<F, Fut>(
    resource_id: &str,
    delete: F,
) -> Result<DeleteOutcome, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    match delete().await {
        Ok(()) => {
            info!("deleted {}", resource_id);
            Ok(DeleteOutcome::Deleted)
        }
        Err(e) if e.is_not_found() => {
            info!("{} already deleted", resource_id);
            Ok(DeleteOutcome::AlreadyAbsent)
        }
        Err(e) => Err(e),
    }
}

/// Turns a not-found read into `ReadOutcome::Gone`
pub fn check_deleted<T>(
    resource_id: &str,
    result: Result<T, ApiError>,
) -> Result<ReadOutcome<T>, ApiError> {
    match result {
        Ok(object) => Ok(ReadOutcome::Found(object)),
        Err(e) if e.is_not_found() => {
            debug!("{} no longer exists, removing it from state", resource_id);
            Ok(ReadOutcome::Gone)
        }
        Err(e) => Err(e),
    }
}

/// Calls `create` unless `lookup` already finds the object
///
/// Only for APIs with a natural lookup key. A failed create is never
/// retried here.
pub async fn create_once<T, L, LFut, C, CFut>(
    lookup: L,
    create: C,
) -> Result<CreateOutcome<T>, ApiError>
where
    L: FnOnce() -> LFut,
    LFut: Future<Output = Result<Option<T>, ApiError>>,
    C: FnOnce() -> CFut,
    CFut: Future<Output = Result<T, ApiError>>,
{
    if let Some(existing) = lookup().await? {
        debug!("object already exists, skipping create");
        return Ok(CreateOutcome::Existing(existing));
    }
    create().await.map(CreateOutcome::Created)
}

/// Names among `attributes` whose value differs between the two states
pub fn changed_attributes<'a>(
    prior: &DynamicValue,
    planned: &DynamicValue,
    attributes: &[&'a str],
) -> Vec<&'a str> {
    attributes
        .iter()
        .copied()
        .filter(|name| {
            let path = AttributePath::new(name);
            let old = prior.get(&path).ok().filter(|v| !matches!(v, Dynamic::Null));
            let new = planned.get(&path).ok().filter(|v| !matches!(v, Dynamic::Null));
            old != new
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn not_found() -> ApiError {
        ApiError::NotFound {
            path: "/v1/p/vpcs/vpc-1".to_string(),
            details: None,
        }
    }

    #[tokio::test]
    async fn delete_twice_both_succeed() {
        let calls = AtomicUsize::new(0);
        let calls = &calls;
        let delete = move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(())
            } else {
                Err(not_found())
            }
        };

        assert_eq!(
            delete_idempotent("vpc-1", delete).await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            delete_idempotent("vpc-1", delete).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn delete_surfaces_other_errors() {
        let result = delete_idempotent("vpc-1", || async {
            Err(ApiError::ApiError {
                status: 409,
                message: "in use".to_string(),
                details: None,
            })
        })
        .await;
        assert_eq!(result.unwrap_err().status(), Some(409));
    }

    #[test]
    fn check_deleted_maps_not_found_to_gone() {
        assert_eq!(
            check_deleted("vpc-1", Ok::<_, ApiError>(7)).unwrap(),
            ReadOutcome::Found(7)
        );
        assert_eq!(
            check_deleted::<i32>("vpc-1", Err(not_found())).unwrap(),
            ReadOutcome::Gone
        );
        assert!(check_deleted::<i32>("vpc-1", Err(ApiError::AuthError(401))).is_err());
    }

    #[tokio::test]
    async fn create_once_skips_existing() {
        let created = AtomicUsize::new(0);
        let counter = &created;
        let outcome = create_once(
            || async { Ok(Some("existing")) },
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("new")
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome, CreateOutcome::Existing("existing"));
        assert_eq!(created.load(Ordering::SeqCst), 0);

        let outcome = create_once(|| async { Ok(None) }, || async { Ok("new") })
            .await
            .unwrap();
        assert_eq!(outcome.into_inner(), "new");
    }

    #[test]
    fn changed_attributes_compares_each_name() {
        let prior = DynamicValue::from(json!({
            "name": "vpc-a",
            "cidr": "192.168.0.0/16",
            "description": null
        }));
        let planned = DynamicValue::from(json!({
            "name": "vpc-b",
            "cidr": "192.168.0.0/16"
        }));

        let changed = changed_attributes(&prior, &planned, &["name", "cidr", "description"]);
        assert_eq!(changed, vec!["name"]);
    }
}
