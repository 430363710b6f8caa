//! Error types.

use thiserror::Error;

/// Failure of a non-inserting lookup.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum MapError {
    #[error("key not found")]
    KeyNotFound,
}

/// Rejected `MapConfig` or policy setting.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("bucket count must be at least 1")]
    ZeroBuckets,
    #[error("max load factor must be finite and positive, got {0}")]
    InvalidMaxLoadFactor(f32),
    #[error("max load factor {0} needs more buckets than can be allocated")]
    LoadFactorTooSmall(f32),
    #[error("bucket count {0} exceeds the allocatable maximum")]
    TooManyBuckets(usize),
}
