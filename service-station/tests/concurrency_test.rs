use service_station::CountingResource;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, timeout};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_acquire_never_exceeds_capacity() {
    let resource = Arc::new(CountingResource::new(3));
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];
    for _ in 0..32 {
        let resource = Arc::clone(&resource);
        let in_use = Arc::clone(&in_use);
        let peak = Arc::clone(&peak);
        handles.push(tokio::spawn(async move {
            for _ in 0..20 {
                let _permit = resource.acquire().await.unwrap();
                let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_use.fetch_sub(1, Ordering::SeqCst);
            }
        }));
    }

    for handle in handles {
        timeout(Duration::from_secs(10), handle)
            .await
            .expect("tasks should finish")
            .unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert_eq!(resource.available_permits(), 3);
    assert_eq!(resource.waiting(), 0);
}

#[tokio::test]
async fn test_fifo_fairness() {
    let resource = Arc::new(CountingResource::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = vec![];
    for i in 0..5 {
        let resource = Arc::clone(&resource);
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _permit = resource.acquire().await.unwrap();
            order.lock().unwrap().push(i);
        }));
        // Give each task time to enqueue before the next one starts.
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(resource.waiting(), 5);

    for _ in 0..5 {
        resource.release();
        sleep(Duration::from_millis(10)).await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_release_is_not_stolen_by_late_try_acquire() {
    let resource = Arc::new(CountingResource::new(0));
    let waiter = tokio::spawn({
        let resource = Arc::clone(&resource);
        async move { resource.acquire_owned().await }
    });
    sleep(Duration::from_millis(10)).await;

    resource.release();
    // The released unit was handed to the queued waiter.
    assert!(resource.try_acquire().is_err());

    let permit = timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    drop(permit);
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_cancelled_waiter_does_not_consume() {
    let resource = Arc::new(CountingResource::new(0));

    let cancelled = tokio::spawn({
        let resource = Arc::clone(&resource);
        async move {
            let _permit = resource.acquire().await.unwrap();
        }
    });
    sleep(Duration::from_millis(10)).await;
    assert_eq!(resource.waiting(), 1);

    cancelled.abort();
    let _ = cancelled.await;
    assert_eq!(resource.waiting(), 0);

    resource.release();
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_timed_out_acquire_leaves_counter_unchanged() {
    let resource = CountingResource::new(1);
    let held = resource.try_acquire().unwrap();

    let result = timeout(Duration::from_millis(20), resource.acquire()).await;
    assert!(result.is_err());
    assert_eq!(resource.waiting(), 0);
    assert_eq!(resource.available_permits(), 0);

    drop(held);
    assert_eq!(resource.available_permits(), 1);
}

#[tokio::test]
async fn test_close_wakes_all_waiters() {
    let resource = Arc::new(CountingResource::new(0));

    let mut handles = vec![];
    for _ in 0..4 {
        let resource = Arc::clone(&resource);
        handles.push(tokio::spawn(async move { resource.acquire().await.is_err() }));
    }
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.waiting(), 4);

    resource.close();
    for handle in handles {
        let failed = timeout(Duration::from_secs(1), handle)
            .await
            .expect("closed waiters should wake")
            .unwrap();
        assert!(failed);
    }
    assert_eq!(resource.waiting(), 0);
}

#[test]
fn test_counter_never_negative_under_thread_stress() {
    let resource = Arc::new(CountingResource::new(2));
    let threads: Vec<_> = (0..8)
        .map(|i| {
            let resource = Arc::clone(&resource);
            std::thread::spawn(move || {
                for round in 0..200 {
                    if (i + round) % 2 == 0 {
                        let permit = resource.acquire_blocking().unwrap();
                        drop(permit);
                    } else if let Ok(permit) = resource.try_acquire() {
                        drop(permit);
                    }
                    assert!(resource.available_permits() <= 2);
                }
            })
        })
        .collect();

    for thread in threads {
        thread.join().unwrap();
    }
    assert_eq!(resource.available_permits(), 2);
}
