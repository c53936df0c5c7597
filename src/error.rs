//! Errors returned by cache construction and invariant checks.
//!
//! Construction fails only for a `max_size` below 2, which leaves no room for
//! one hot and one cold entry. Nothing else in the crate returns an error
//! except the `check_invariants` diagnostics.

use std::fmt;

/// Description of a broken internal invariant.
///
/// Returned by `check_invariants` on the ring and on both cache builds
/// (e.g. [`HotColdCache::check_invariants`](crate::policy::hot_cold::HotColdCache::check_invariants)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

/// Rejected cache settings.
///
/// Returned by the cache constructors and by
/// [`CacheBuilder::build`](crate::builder::CacheBuilder::build).
///
/// ```
/// use hotcold::policy::hot_cold::HotColdCache;
///
/// let err = HotColdCache::<u64, u64>::new(0).unwrap_err();
/// assert!(err.to_string().contains("max_size"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }

    /// `max_size` cannot hold one hot and one cold entry.
    pub(crate) fn max_size_too_small(max_size: usize) -> Self {
        Self::new(format!(
            "max_size must be at least 2 (one hot and one cold slot), got {}",
            max_size
        ))
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CacheBuilder;
    use crate::policy::hot_cold::HotColdCache;

    #[test]
    fn max_size_error_names_the_value() {
        let err = ConfigError::max_size_too_small(1);
        assert!(err.message().contains("max_size"));
        assert!(err.message().ends_with("got 1"));
    }

    #[test]
    fn constructors_and_builder_report_the_same_error() {
        let direct = HotColdCache::<u32, u32>::new(0).unwrap_err();
        let built = CacheBuilder::new(0).build::<u32, u32>().unwrap_err();
        assert_eq!(direct, ConfigError::max_size_too_small(0));
        assert_eq!(direct, built);
        assert_eq!(direct.to_string(), direct.message());
    }

    #[test]
    fn errors_box_into_dyn_error() {
        let config: Box<dyn std::error::Error> = Box::new(ConfigError::max_size_too_small(1));
        let invariant: Box<dyn std::error::Error> =
            Box::new(InvariantError::new("hot region holds 3 nodes, expected 2"));
        assert!(config.to_string().ends_with("got 1"));
        assert_eq!(invariant.to_string(), "hot region holds 3 nodes, expected 2");
    }
}
