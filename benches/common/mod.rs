#![allow(unused)] // needed due to linting bug in Rust Analyzer for benches

mod common_bench;
pub use common_bench::*;

mod fold_reducer_bench;
pub use fold_reducer_bench::*;

mod mutex_bench;
pub use mutex_bench::*;
