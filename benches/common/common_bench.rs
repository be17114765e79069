use criterion::black_box;
use std::thread;

pub const NTHREADS: u64 = 16;
pub const NENTRIES: u64 = 1000;

/// Expected total when every thread folds `0..NENTRIES`.
pub const EXPECTED_SUM: u64 = NTHREADS * NENTRIES * (NENTRIES - 1) / 2;

pub trait BenchTarget {
    fn add_value(&self, value: u64);
    fn total(&self) -> u64;
}

pub fn bench(target: impl BenchTarget + Sync) {
    {
        let target = &target;
        thread::scope(|s| {
            let hs = (0..NTHREADS)
                .map(|_| {
                    s.spawn(move || {
                        for j in 0..NENTRIES {
                            target.add_value(black_box(j));
                        }
                    })
                })
                .collect::<Vec<_>>();

            hs.into_iter().for_each(|h| h.join().unwrap());
        });
    }

    let total = target.total();
    assert_eq!(total, EXPECTED_SUM);
    black_box(total);
}
