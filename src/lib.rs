#![deny(clippy::unwrap_used)]
#![allow(clippy::type_complexity, clippy::new_without_default)]
#![doc = include_str!("../README.md")]

#[cfg(test)]
mod test_support;

pub mod algebra;
pub mod config;
pub mod local;
pub mod pm;
pub mod reducer;

pub use algebra::{Algebra, FnAlgebra, Sum};
pub use config::{ConfigError, ReducerConfig, DEFAULT_CLEANUP_COUNT};
pub use local::LocalAccumulator;
pub use reducer::{into_ok, FoldReducer, ReducerStats};
