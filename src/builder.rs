//! Cache configuration and builder.
//!
//! [`HotColdConfig`] holds the two knobs both builds share (`max_size` and
//! `hot_fraction`) and derives the hot region size from them.
//! [`CacheBuilder`] is the entry point for code that picks the concurrency
//! build at runtime or loads settings from elsewhere.
//!
//! ## Example
//!
//! ```rust
//! use hotcold::builder::CacheBuilder;
//!
//! let mut cache = CacheBuilder::new(100)
//!     .hot_fraction(0.25)
//!     .build::<u64, String>()
//!     .unwrap();
//! cache.add(1, "hello".to_string());
//! assert_eq!(cache.try_get(&1), Some(&"hello".to_string()));
//! assert_eq!(cache.hot_size(), 25);
//! ```

use std::hash::Hash;

use crate::error::ConfigError;
use crate::policy::hot_cold::HotColdCache;

#[cfg(feature = "concurrency")]
use crate::policy::concurrent_hot_cold::ConcurrentHotColdCache;

/// Smallest `max_size` that leaves room for one hot and one cold entry.
pub const MIN_MAX_SIZE: usize = 2;

/// Share of `max_size` given to the hot region unless configured otherwise.
pub const DEFAULT_HOT_FRACTION: f64 = 0.5;

/// Settings shared by [`HotColdCache`] and `ConcurrentHotColdCache`.
///
/// | Field          | Default | Description                            |
/// |----------------|---------|----------------------------------------|
/// | `max_size`     | 1000    | Hard capacity, at least 2              |
/// | `hot_fraction` | 0.5     | Share of `max_size` for the hot region |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotColdConfig {
    pub max_size: usize,
    pub hot_fraction: f64,
}

impl HotColdConfig {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            hot_fraction: DEFAULT_HOT_FRACTION,
        }
    }

    /// Rejects a `max_size` below [`MIN_MAX_SIZE`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size < MIN_MAX_SIZE {
            return Err(ConfigError::max_size_too_small(self.max_size));
        }
        Ok(())
    }

    /// `max_size * hot_fraction` rounded down, clamped to `[1, max_size - 1]`.
    ///
    /// Out-of-range or non-finite fractions land on one of the bounds.
    pub fn hot_size(&self) -> usize {
        let upper = self.max_size.saturating_sub(1).max(1);
        let raw = (self.max_size as f64 * self.hot_fraction).floor();
        (raw as usize).clamp(1, upper)
    }
}

impl Default for HotColdConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Builder for either cache build.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: HotColdConfig,
}

impl CacheBuilder {
    /// Starts a builder for a cache holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            config: HotColdConfig::new(max_size),
        }
    }

    /// Starts a builder from an existing configuration.
    pub fn from_config(config: HotColdConfig) -> Self {
        Self { config }
    }

    /// Sets the share of `max_size` reserved for the hot region.
    pub fn hot_fraction(mut self, hot_fraction: f64) -> Self {
        self.config.hot_fraction = hot_fraction;
        self
    }

    pub fn config(&self) -> &HotColdConfig {
        &self.config
    }

    /// Builds the single-threaded cache.
    pub fn build<K, V>(self) -> Result<HotColdCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        HotColdCache::from_config(self.config)
    }

    /// Builds the thread-safe cache.
    #[cfg(feature = "concurrency")]
    pub fn build_concurrent<K, V>(self) -> Result<ConcurrentHotColdCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
    {
        ConcurrentHotColdCache::from_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HotColdConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.hot_fraction, DEFAULT_HOT_FRACTION);
        assert_eq!(config.hot_size(), 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn hot_size_rounds_down() {
        let config = HotColdConfig::new(3);
        assert_eq!(config.hot_size(), 1);

        let config = HotColdConfig {
            max_size: 10,
            hot_fraction: 0.39,
        };
        assert_eq!(config.hot_size(), 3);
    }

    #[test]
    fn hot_size_is_clamped() {
        let none = HotColdConfig {
            max_size: 10,
            hot_fraction: 0.0,
        };
        assert_eq!(none.hot_size(), 1);

        let all = HotColdConfig {
            max_size: 10,
            hot_fraction: 1.0,
        };
        assert_eq!(all.hot_size(), 9);

        let negative = HotColdConfig {
            max_size: 10,
            hot_fraction: -3.0,
        };
        assert_eq!(negative.hot_size(), 1);

        let nan = HotColdConfig {
            max_size: 10,
            hot_fraction: f64::NAN,
        };
        assert_eq!(nan.hot_size(), 1);

        let huge = HotColdConfig {
            max_size: 10,
            hot_fraction: f64::INFINITY,
        };
        assert_eq!(huge.hot_size(), 9);
    }

    #[test]
    fn smallest_cache_has_one_hot_slot() {
        let config = HotColdConfig::new(2);
        assert_eq!(config.hot_size(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_size_below_two_is_rejected() {
        assert!(HotColdConfig::new(0).validate().is_err());
        assert!(HotColdConfig::new(1).validate().is_err());
        assert!(CacheBuilder::new(1).build::<u32, u32>().is_err());
    }

    #[test]
    fn builder_applies_hot_fraction() {
        let cache = CacheBuilder::new(8)
            .hot_fraction(0.25)
            .build::<u32, u32>()
            .unwrap();
        assert_eq!(cache.max_size(), 8);
        assert_eq!(cache.hot_size(), 2);
    }

    #[cfg(feature = "concurrency")]
    #[test]
    fn builder_builds_concurrent_cache() {
        let cache = CacheBuilder::from_config(HotColdConfig::new(16))
            .build_concurrent::<u32, u32>()
            .unwrap();
        assert_eq!(cache.max_size(), 16);
        assert_eq!(cache.hot_size(), 8);
        assert!(
            CacheBuilder::new(0)
                .build_concurrent::<u32, u32>()
                .is_err()
        );
    }
}
