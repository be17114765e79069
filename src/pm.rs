//! Request-timing probe built on [`FoldReducer`].
//!
//! A [`Pm`] times one unit of work and folds the elapsed time, under a key, into a [`PmReducer`]. Each
//! thread accumulates its own [`PmTable`] without contention; [`report_window`] flushes the merged table of
//! the current window and starts a new one.

use crate::{
    algebra::Algebra,
    config::ReducerConfig,
    reducer::{into_ok, FoldReducer},
};
use std::{
    any::type_name,
    collections::BTreeMap,
    convert::Infallible,
    time::{Duration, Instant},
};

/// Aggregated timings for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmInfo {
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl PmInfo {
    /// Records one sample.
    pub fn record(&mut self, elapsed: Duration) {
        if self.count == 0 {
            self.min = elapsed;
            self.max = elapsed;
        } else {
            self.min = self.min.min(elapsed);
            self.max = self.max.max(elapsed);
        }
        self.count += 1;
        self.total += elapsed;
    }

    /// Combines the samples of `self` and `other`.
    pub fn merge(self, other: PmInfo) -> PmInfo {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        PmInfo {
            count: self.count + other.count,
            total: self.total + other.total,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Mean duration, `None` if nothing was recorded.
    pub fn average(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

/// Timings keyed by probe name.
pub type PmTable = BTreeMap<String, PmInfo>;

/// One timing sample: probe key and elapsed time.
pub type PmSample = (String, Duration);

/// Reducer of timing samples into a [`PmTable`].
pub type PmReducer = FoldReducer<PmSample, PmTable>;

/// [`Algebra`] that folds [`PmSample`]s into a [`PmTable`] and merges tables key-wise.
#[derive(Debug, Clone, Copy, Default)]
pub struct PmAlgebra;

impl Algebra for PmAlgebra {
    type Op = PmSample;
    type State = PmTable;
    type Error = Infallible;

    fn initial_state(&self) -> Result<PmTable, Infallible> {
        Ok(PmTable::new())
    }

    fn fold(&self, state: &mut PmTable, (key, elapsed): PmSample) -> Result<(), Infallible> {
        state.entry(key).or_default().record(elapsed);
        Ok(())
    }

    fn reduce(&self, s1: PmTable, s2: PmTable) -> Result<PmTable, Infallible> {
        let (mut big, small) = if s1.len() >= s2.len() {
            (s1, s2)
        } else {
            (s2, s1)
        };
        for (key, info) in small {
            let entry = big.entry(key).or_default();
            *entry = entry.merge(info);
        }
        Ok(big)
    }
}

/// Creates a [`PmReducer`] with the default [`ReducerConfig`].
pub fn pm_reducer() -> PmReducer {
    pm_reducer_with_config(ReducerConfig::default())
}

/// Creates a [`PmReducer`] with an explicit configuration.
pub fn pm_reducer_with_config(config: ReducerConfig) -> PmReducer {
    into_ok(FoldReducer::with_algebra(PmAlgebra, config))
}

/// Timer for one unit of work.
#[derive(Debug)]
pub struct Pm {
    key: String,
    start: Instant,
}

impl Pm {
    /// Starts timing under `key`.
    pub fn start(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            start: Instant::now(),
        }
    }

    /// Starts timing under the key `"<type name>:<name>"`.
    pub fn start_for<T: ?Sized>(name: &str) -> Self {
        Self::start(format!("{}:{}", type_name::<T>(), name))
    }

    /// Key the sample will be recorded under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stops timing and folds the sample into `reducer`.
    pub fn log(self, reducer: &PmReducer) {
        let elapsed = self.start.elapsed();
        into_ok(reducer.fold((self.key, elapsed)));
    }
}

/// Flushes the current window of `reducer`, logging one line per key, and returns it.
pub fn report_window(reducer: &PmReducer) -> PmTable {
    let window = into_ok(reducer.reset_state());
    for (key, info) in &window {
        log::info!(
            "pm key={key} count={} total={:?} min={:?} max={:?} avg={:?}",
            info.count,
            info.total,
            info.min,
            info.max,
            info.average()
        );
    }
    window
}
