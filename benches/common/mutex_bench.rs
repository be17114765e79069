//! Baseline: every update goes through a single mutex-guarded accumulator.

use super::{bench, BenchTarget};
use std::sync::Mutex;

struct BenchStruct(Mutex<u64>);

impl BenchTarget for BenchStruct {
    fn add_value(&self, value: u64) {
        *self.0.lock().unwrap() += value;
    }

    fn total(&self) -> u64 {
        *self.0.lock().unwrap()
    }
}

pub fn mutex_bench() {
    bench(BenchStruct(Mutex::new(0)));
}
