use futures::executor::{block_on, ThreadPool};
use futures::future::join_all;
use futures::task::SpawnExt;
use service_station::{BoundedWorkQueue, CountingResource, StationError};
use std::sync::Arc;

#[test]
fn test_futures_runtime_basic_usage() {
    block_on(async {
        let resource = CountingResource::new(2);

        let permit1 = resource.acquire().await.unwrap();
        let permit2 = resource.acquire().await.unwrap();
        assert_eq!(resource.available_permits(), 0);
        assert!(resource.try_acquire().is_err());

        drop(permit1);
        assert_eq!(resource.available_permits(), 1);
        drop(permit2);
        assert_eq!(resource.available_permits(), 2);
    });
}

#[test]
fn test_futures_thread_pool_queue() {
    let pool = ThreadPool::builder().pool_size(4).create().unwrap();
    let queue = Arc::new(BoundedWorkQueue::new(2).unwrap());

    let producers: Vec<_> = (0..4u32)
        .map(|p| {
            let queue = Arc::clone(&queue);
            pool.spawn_with_handle(async move {
                for i in 0..25 {
                    queue.enqueue(p * 100 + i).await.unwrap();
                }
            })
            .unwrap()
        })
        .collect();

    let consumer = {
        let queue = Arc::clone(&queue);
        pool.spawn_with_handle(async move {
            let mut seen = Vec::new();
            for _ in 0..100 {
                seen.push(queue.dequeue().await.unwrap());
            }
            seen
        })
        .unwrap()
    };

    block_on(join_all(producers));
    let mut seen = block_on(consumer);
    seen.sort_unstable();
    let mut expected: Vec<u32> = (0..4).flat_map(|p| (0..25).map(move |i| p * 100 + i)).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
    assert!(queue.snapshot().is_balanced());
}

#[test]
fn test_futures_runtime_close() {
    block_on(async {
        let queue = BoundedWorkQueue::<u8>::new(1).unwrap();
        queue.close();
        assert_eq!(queue.dequeue().await.unwrap_err(), StationError::Closed);
        assert_eq!(queue.enqueue(1).await.unwrap_err(), StationError::Closed);
    });
}

#[test]
fn test_smol_runtime_handoff() {
    smol::block_on(async {
        let resource = Arc::new(CountingResource::new(0));
        let waiter = smol::spawn({
            let resource = Arc::clone(&resource);
            async move { resource.acquire_owned().await.map(|permit| permit.num_permits()) }
        });

        smol::Timer::after(std::time::Duration::from_millis(10)).await;
        resource.release();
        assert_eq!(waiter.await.unwrap(), 1);
        assert_eq!(resource.available_permits(), 1);
    });
}
