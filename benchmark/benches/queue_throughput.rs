use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use service_station::BoundedWorkQueue;
use std::sync::Arc;
use std::time::Duration;

const ITEMS: usize = 10_000;
const CAPACITIES: &[usize] = &[1, 5, 64];

/// Producers and consumers moving `ITEMS` items through queues of
/// different capacities.
fn bench_async_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_async");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(ITEMS as u64));

    for &capacity in CAPACITIES {
        for &(producers, consumers) in &[(1usize, 1usize), (4, 4)] {
            let test_name = format!("cap_{}_{}p_{}c", capacity, producers, consumers);
            group.bench_with_input(
                BenchmarkId::new("tokio_tasks", &test_name),
                &(capacity, producers, consumers),
                |b, &(capacity, producers, consumers)| {
                    let rt = tokio::runtime::Runtime::new().unwrap();
                    b.iter(|| {
                        rt.block_on(async {
                            let queue = Arc::new(BoundedWorkQueue::new(capacity).unwrap());
                            let per_producer = ITEMS / producers;
                            let per_consumer = ITEMS / consumers;

                            let mut tasks = Vec::new();
                            for _ in 0..producers {
                                let queue = Arc::clone(&queue);
                                tasks.push(tokio::spawn(async move {
                                    for i in 0..per_producer {
                                        queue.enqueue(i).await.unwrap();
                                    }
                                    0
                                }));
                            }
                            for _ in 0..consumers {
                                let queue = Arc::clone(&queue);
                                tasks.push(tokio::spawn(async move {
                                    let mut sum = 0usize;
                                    for _ in 0..per_consumer {
                                        sum = sum.wrapping_add(queue.dequeue().await.unwrap());
                                    }
                                    sum
                                }));
                            }

                            let results = futures::future::join_all(tasks).await;
                            black_box(results.len());
                        });
                    });
                },
            );
        }
    }

    group.finish();
}

/// The same hand-off driven from OS threads through the blocking wrappers.
fn bench_blocking_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_blocking");
    group.sample_size(20);
    group.throughput(Throughput::Elements(ITEMS as u64));

    for &capacity in CAPACITIES {
        group.bench_with_input(BenchmarkId::new("threads", capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let queue = Arc::new(BoundedWorkQueue::new(capacity).unwrap());
                let producer = {
                    let queue = Arc::clone(&queue);
                    std::thread::spawn(move || {
                        for i in 0..ITEMS {
                            queue.enqueue_blocking(i).unwrap();
                        }
                    })
                };
                let mut last = 0;
                for _ in 0..ITEMS {
                    last = queue.dequeue_blocking().unwrap();
                }
                producer.join().unwrap();
                black_box(last);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_async_throughput, bench_blocking_throughput);
criterion_main!(benches);
