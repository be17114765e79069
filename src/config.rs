//! Runtime configuration of a [`crate::FoldReducer`].

use thiserror::Error;

/// Default number of local accumulator connections that forces a full merge.
pub const DEFAULT_CLEANUP_COUNT: usize = 5000;

/// Errors returned when building a [`ReducerConfig`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A cleanup threshold of zero would force a merge on every connection.
    #[error("cleanup count must be greater than zero")]
    ZeroCleanupCount,
}

/// Tuning parameters for a [`crate::FoldReducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReducerConfig {
    cleanup_count: usize,
}

impl ReducerConfig {
    /// Creates a configuration with the given cleanup threshold.
    ///
    /// `cleanup_count` is the number of local accumulator connections since the last full merge after
    /// which the next connection triggers an eager merge-and-clear of the registry.
    pub fn new(cleanup_count: usize) -> Result<Self, ConfigError> {
        if cleanup_count == 0 {
            return Err(ConfigError::ZeroCleanupCount);
        }
        Ok(Self { cleanup_count })
    }

    /// Returns a copy of `self` with a different cleanup threshold.
    pub fn with_cleanup_count(self, cleanup_count: usize) -> Result<Self, ConfigError> {
        if cleanup_count == 0 {
            return Err(ConfigError::ZeroCleanupCount);
        }
        let mut config = self;
        config.cleanup_count = cleanup_count;
        Ok(config)
    }

    /// Connections since the last full merge after which the next connection forces a merge.
    pub fn cleanup_count(&self) -> usize {
        self.cleanup_count
    }
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            cleanup_count: DEFAULT_CLEANUP_COUNT,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{ConfigError, ReducerConfig, DEFAULT_CLEANUP_COUNT};

    #[test]
    fn default_threshold() {
        assert_eq!(
            ReducerConfig::default().cleanup_count(),
            DEFAULT_CLEANUP_COUNT
        );
    }

    #[test]
    fn builder_overrides_threshold() {
        let base = ReducerConfig::new(3).unwrap();
        let tuned = base.with_cleanup_count(11).unwrap();
        assert_eq!(tuned.cleanup_count(), 11);
        assert_eq!(base.cleanup_count(), 3, "builder works on a copy");
        assert_eq!(tuned, ReducerConfig::new(11).unwrap());
    }

    #[test]
    fn zero_threshold_rejected() {
        assert_eq!(ReducerConfig::new(0), Err(ConfigError::ZeroCleanupCount));
        assert_eq!(
            ReducerConfig::default().with_cleanup_count(0),
            Err(ConfigError::ZeroCleanupCount)
        );
        assert_eq!(
            ReducerConfig::default()
                .with_cleanup_count(7)
                .map(|c| c.cleanup_count()),
            Ok(7)
        );
    }
}
