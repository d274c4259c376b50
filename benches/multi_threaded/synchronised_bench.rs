use std::sync::Barrier;
use std::time::{Duration, Instant};
use crossbeam::thread;

use criterion::{black_box, measurement::WallTime, BenchmarkGroup, BenchmarkId};

pub struct Config<const NTHREAD: usize>;

/// Measure `access` performed concurrently by NT threads.
///
/// For each sample, NT threads are started, wait until all of them are
/// ready, then call `access` `iter` times. The measured time goes from
/// the release of the threads to the end of the last one.
pub fn synchro_bench_input<I, T, R, const NT: usize>(
    c: &mut BenchmarkGroup<WallTime>,
    id: BenchmarkId,
    input: &I,
    build: impl Fn(&I) -> T,
    access: impl Fn(&T, u64) -> R + Sync,
    _: Config<NT>,
) where
    T: Sync,
    I: ?Sized,
{
    let v = build(input);

    c.bench_with_input(id, input, |b, _| {
        b.iter_custom(|iter| {
            let start = Barrier::new(NT + 1);
            let mut elapsed = Duration::from_nanos(0);
            thread::scope(|s| {
                let spawned: Vec<_> = (0..NT)
                    .map(|_| {
                        s.spawn(|_| {
                            start.wait();
                            for j in 0..iter {
                                black_box(access(&v, j));
                            }
                        })
                    })
                    .collect();
                start.wait();
                let t = Instant::now();
                spawned.into_iter().for_each(|h| h.join().unwrap());
                elapsed = t.elapsed();
            })
            .unwrap();
            elapsed
        })
    });
}
