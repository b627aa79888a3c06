//! Slot array configuration parameters.

use crate::error::SlotArrayError;

/// How the Growth Manager sizes each commit once the high-water mark
/// crosses into uncommitted memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Commit the smallest whole number of `pages`-sized steps that covers
    /// the requested index.
    Linear {
        /// OS pages per growth step. Must be at least 1.
        pages: u32,
    },
    /// At least double the committed extent on every growth.
    ///
    /// Fewer commit calls for fast-growing arrays, at the cost of
    /// committing up to twice the memory actually in use.
    Doubling,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::Linear { pages: 1 }
    }
}

/// Configuration for a [`SlotArray`](crate::SlotArray).
///
/// The element type and maximum element count are type parameters of the
/// array; this struct only controls how the reserved range is committed.
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotArrayConfig {
    /// OS pages of slot storage committed when the array is created.
    ///
    /// Default: 1. Must be at least 1. Clamped to the reservation size.
    pub initial_pages: u32,

    /// Growth policy once the initial pages are exhausted.
    pub growth: GrowthPolicy,
}

impl SlotArrayConfig {
    /// Default number of pages committed at construction.
    pub const DEFAULT_INITIAL_PAGES: u32 = 1;

    /// Create a config with the default values.
    pub fn new() -> Self {
        Self {
            initial_pages: Self::DEFAULT_INITIAL_PAGES,
            growth: GrowthPolicy::default(),
        }
    }

    /// Set the number of pages committed up front.
    pub fn with_initial_pages(mut self, pages: u32) -> Self {
        self.initial_pages = pages;
        self
    }

    /// Set the growth policy.
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Check the config for values the Growth Manager cannot work with.
    pub fn validate(&self) -> Result<(), SlotArrayError> {
        if self.initial_pages == 0 {
            return Err(SlotArrayError::InvalidConfig {
                reason: "initial_pages must be at least 1".into(),
            });
        }
        if let GrowthPolicy::Linear { pages: 0 } = self.growth {
            return Err(SlotArrayError::InvalidConfig {
                reason: "linear growth step must be at least 1 page".into(),
            });
        }
        Ok(())
    }
}

impl Default for SlotArrayConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_commits_one_page_linearly() {
        let config = SlotArrayConfig::default();
        assert_eq!(config.initial_pages, 1);
        assert_eq!(config.growth, GrowthPolicy::Linear { pages: 1 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_initial_pages_rejected() {
        let config = SlotArrayConfig::new().with_initial_pages(0);
        assert!(matches!(
            config.validate(),
            Err(SlotArrayError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn zero_linear_step_rejected() {
        let config = SlotArrayConfig::new().with_growth(GrowthPolicy::Linear { pages: 0 });
        assert!(matches!(
            config.validate(),
            Err(SlotArrayError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn doubling_is_valid() {
        let config = SlotArrayConfig::new()
            .with_initial_pages(4)
            .with_growth(GrowthPolicy::Doubling);
        assert!(config.validate().is_ok());
    }
}
