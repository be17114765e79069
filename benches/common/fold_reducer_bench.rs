//! Benchmark for [`fold_reduce::FoldReducer`].

use super::{bench, BenchTarget};
use fold_reduce::{FoldReducer, ReducerConfig, Sum};

struct BenchStruct(FoldReducer<u64, u64>);

impl BenchTarget for BenchStruct {
    fn add_value(&self, value: u64) {
        self.0.fold(value).unwrap();
    }

    fn total(&self) -> u64 {
        self.0.get_state().unwrap()
    }
}

pub fn fold_reducer_bench() {
    let reducer = FoldReducer::with_algebra(Sum::new(), ReducerConfig::default()).unwrap();
    bench(BenchStruct(reducer));
}

/// Same workload with a snapshot every 100 folds on each thread.
struct SnapshottingBenchStruct(FoldReducer<u64, u64>);

impl BenchTarget for SnapshottingBenchStruct {
    fn add_value(&self, value: u64) {
        self.0.fold(value).unwrap();
        if value % 100 == 0 {
            self.0.get_state().unwrap();
        }
    }

    fn total(&self) -> u64 {
        self.0.get_state().unwrap()
    }
}

pub fn fold_reducer_snapshotting_bench() {
    let reducer = FoldReducer::with_algebra(Sum::new(), ReducerConfig::default()).unwrap();
    bench(SnapshottingBenchStruct(reducer));
}
