use std::thread;

use bsw_spsc::Queue;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const OPS_PER_ITER: u64 = 10_000;

/// Single-threaded write/read pairs: the cost of the counter protocol alone.
fn bench_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(OPS_PER_ITER));

    group.bench_function("write_read_cap8", |b| {
        let mut queue: Queue<u64, 8> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        b.iter(|| {
            for i in 0..OPS_PER_ITER {
                tx.write(black_box(i));
                black_box(rx.read());
            }
        })
    });

    group.bench_function("fill_drain_cap64", |b| {
        let mut queue: Queue<u64, 64> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        b.iter(|| {
            for i in 0..OPS_PER_ITER / 64 {
                while !tx.full() {
                    tx.write(black_box(i));
                }
                while let Ok(value) = rx.try_read() {
                    black_box(value);
                }
            }
        })
    });

    group.bench_function("tracked_check_consumed_cap16", |b| {
        let mut queue: Queue<u64, 16, true> = Queue::new();
        let (mut tx, mut rx) = queue.split();
        b.iter(|| {
            for i in 0..OPS_PER_ITER {
                if tx.full() {
                    tx.check_consumed(|value| {
                        black_box(value);
                    });
                }
                tx.write(black_box(i));
                rx.advance();
            }
            tx.check_consumed(|value| {
                black_box(value);
            });
        })
    });

    group.finish();
}

/// Producer and consumer on separate threads.
fn bench_cross_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_threads");
    group.throughput(Throughput::Elements(OPS_PER_ITER));

    for capacity in [16usize, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            b.iter(|| {
                if cap == 16 {
                    transfer::<16>();
                } else {
                    transfer::<256>();
                }
            })
        });
    }

    group.finish();
}

fn transfer<const N: usize>() {
    let mut queue: Queue<u64, N> = Queue::new();
    let (mut tx, mut rx) = queue.split();
    thread::scope(|scope| {
        scope.spawn(move || {
            for i in 0..OPS_PER_ITER {
                let mut pending = i;
                while let Err(back) = tx.try_write(pending) {
                    pending = back;
                    std::hint::spin_loop();
                }
            }
        });
        let mut received = 0;
        while received < OPS_PER_ITER {
            if let Ok(value) = rx.try_read() {
                black_box(value);
                received += 1;
            }
        }
    });
}

criterion_group!(benches, bench_write_read, bench_cross_thread);
criterion_main!(benches);
