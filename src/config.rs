//! Construction-time configuration.

use crate::bucket_index::{
    is_valid_max_load_factor, min_buckets_for, GrowthPolicy, DEFAULT_BUCKET_COUNT,
    DEFAULT_MAX_LOAD_FACTOR, MAX_BUCKET_COUNT,
};
use crate::error::ConfigError;

/// Sizing knobs for an `UnorderedMap`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapConfig {
    /// Initial number of buckets.
    pub bucket_count: usize,
    /// Load factor above which the map grows.
    pub max_load_factor: f32,
    /// Growth step once `max_load_factor` is exceeded.
    pub growth: GrowthPolicy,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            growth: GrowthPolicy::default(),
        }
    }
}

impl MapConfig {
    pub fn bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    pub fn max_load_factor(mut self, max_load_factor: f32) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket_count == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        if self.bucket_count > MAX_BUCKET_COUNT {
            return Err(ConfigError::TooManyBuckets(self.bucket_count));
        }
        if !is_valid_max_load_factor(self.max_load_factor) {
            return Err(ConfigError::InvalidMaxLoadFactor(self.max_load_factor));
        }
        if min_buckets_for(1, self.max_load_factor).is_none() {
            return Err(ConfigError::LoadFactorTooSmall(self.max_load_factor));
        }
        Ok(())
    }
}
