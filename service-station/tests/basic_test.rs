use service_station::{AcquireError, CountingResource, StationError, TryAcquireError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[tokio::test]
async fn test_resource_creation() {
    let resource = CountingResource::new(5);
    assert_eq!(resource.available_permits(), 5);
    assert_eq!(resource.waiting(), 0);
    assert!(!resource.is_closed());
}

#[tokio::test]
async fn test_resource_creation_zero_permits() {
    let resource = CountingResource::new(0);
    assert_eq!(resource.available_permits(), 0);

    // try_acquire should fail immediately
    let result = resource.try_acquire();
    assert!(matches!(result, Err(TryAcquireError::NoPermits)));
}

#[tokio::test]
async fn test_resource_creation_max_permits() {
    let resource = CountingResource::new(CountingResource::MAX_PERMITS);
    assert_eq!(resource.available_permits(), CountingResource::MAX_PERMITS);
}

#[test]
fn test_negative_capacity_rejected() {
    let err = CountingResource::with_capacity(-1).unwrap_err();
    assert_eq!(
        err,
        StationError::InvalidCapacity {
            resource: "counting resource",
            requested: -1
        }
    );

    let resource = CountingResource::with_capacity(4).unwrap();
    assert_eq!(resource.available_permits(), 4);
}

#[test]
fn test_capacity_above_max_rejected() {
    let too_many = CountingResource::MAX_PERMITS as i64 + 1;
    assert!(matches!(
        CountingResource::with_capacity(too_many),
        Err(StationError::InvalidCapacity { .. })
    ));
}

#[tokio::test]
async fn test_try_acquire_success() {
    let resource = CountingResource::new(3);

    let permit1 = resource.try_acquire().unwrap();
    assert_eq!(resource.available_permits(), 2);

    let permit2 = resource.try_acquire().unwrap();
    assert_eq!(resource.available_permits(), 1);

    let permit3 = resource.try_acquire().unwrap();
    assert_eq!(resource.available_permits(), 0);

    drop(permit1);
    drop(permit2);
    drop(permit3);
    assert_eq!(resource.available_permits(), 3);
}

#[tokio::test]
async fn test_async_acquire_success() {
    let resource = CountingResource::new(2);

    let permit1 = timeout(Duration::from_millis(100), resource.acquire())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resource.available_permits(), 1);

    let permit2 = timeout(Duration::from_millis(100), resource.acquire())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resource.available_permits(), 0);

    drop(permit1);
    drop(permit2);
}

#[tokio::test]
async fn test_acquire_waits_for_release() {
    let resource = Arc::new(CountingResource::new(1));
    let held = resource.try_acquire().unwrap();

    let waiter = {
        let resource = Arc::clone(&resource);
        tokio::spawn(async move {
            let _permit = resource.acquire().await.unwrap();
        })
    };

    sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished(), "acquire must block while the counter is zero");
    assert_eq!(resource.waiting(), 1);

    drop(held);
    timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should be released")
        .unwrap();
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_release_without_permit_object() {
    let resource = CountingResource::new(0);
    resource.release();
    resource.release();
    assert_eq!(resource.available_permits(), 2);

    let permit = resource.acquire().await.unwrap();
    permit.forget();
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_release_hands_permit_to_waiter() {
    let resource = Arc::new(CountingResource::new(0));
    let waiter = tokio::spawn({
        let resource = Arc::clone(&resource);
        async move { resource.acquire_owned().await }
    });
    sleep(Duration::from_millis(20)).await;

    resource.release();
    let permit = timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    // The released unit went straight to the waiter.
    assert_eq!(resource.available_permits(), 0);
    drop(permit);
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_add_and_forget_permits() {
    let resource = CountingResource::new(1);
    resource.add_permits(4);
    assert_eq!(resource.available_permits(), 5);

    assert_eq!(resource.forget_permits(2), 2);
    assert_eq!(resource.available_permits(), 3);

    assert_eq!(resource.forget_permits(10), 3);
    assert_eq!(resource.available_permits(), 0);
    assert_eq!(resource.forget_permits(0), 0);
}

#[tokio::test]
async fn test_close_rejects_new_acquisitions() {
    let resource = CountingResource::new(2);
    let held = resource.try_acquire().unwrap();

    resource.close();
    assert!(resource.is_closed());
    assert!(matches!(resource.try_acquire(), Err(TryAcquireError::Closed)));
    let err: AcquireError = resource.acquire().await.unwrap_err();
    assert_eq!(err.to_string(), "counting resource closed");

    // Permits granted before the close are still returned normally.
    drop(held);
    assert_eq!(resource.available_permits(), 2);
}

#[test]
fn test_error_display() {
    assert_eq!(TryAcquireError::NoPermits.to_string(), "no permits available");
    assert!(TryAcquireError::Closed.is_closed());
    assert!(TryAcquireError::NoPermits.is_no_permits());
    assert_eq!(
        StationError::InvalidCapacity {
            resource: "bay pool",
            requested: 0
        }
        .to_string(),
        "invalid capacity for bay pool: 0"
    );
}
