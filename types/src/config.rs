//! Construction-time table configuration.
//!
//! All options are fixed once an engine is built. [`EngineConfig::validate`]
//! must pass before an engine will start.

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Tolerance used when checking that bucket weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One row of the target-multiplier distribution: a `weight` share of rounds
/// draw uniformly from `[low, high)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiplierBucket {
    pub weight: f64,
    pub low: f64,
    pub high: f64,
}

impl MultiplierBucket {
    pub const fn new(weight: f64, low: f64, high: f64) -> Self {
        Self { weight, low, high }
    }

    /// Midpoint of the bucket, the mean of a uniform draw within it.
    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Default distribution. Order matters: buckets are selected by walking the
/// cumulative weights in this order.
pub const DEFAULT_BUCKETS: [MultiplierBucket; 4] = [
    MultiplierBucket::new(0.70, 1.00, 2.00),
    MultiplierBucket::new(0.20, 2.00, 4.00),
    MultiplierBucket::new(0.08, 4.00, 7.00),
    MultiplierBucket::new(0.02, 7.00, 10.00),
];

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("multiplier_step must be finite and positive (got={0})")]
    InvalidStep(f64),
    #[error("history_capacity must be greater than zero")]
    ZeroHistoryCapacity,
    #[error("escape_probability must be within [0, 1] (got={0})")]
    EscapeProbabilityOutOfRange(f64),
    #[error("escape_floor must be at least 1.0 (got={0})")]
    EscapeFloorBelowOne(f64),
    #[error("escape_margin must be finite and non-negative (got={0})")]
    InvalidEscapeMargin(f64),
    #[error("bucket table is empty")]
    EmptyBucketTable,
    #[error("bucket {index} has an invalid range [{low}, {high})")]
    InvalidBucketRange { index: usize, low: f64, high: f64 },
    #[error("bucket {index} has a non-positive weight (got={weight})")]
    InvalidBucketWeight { index: usize, weight: f64 },
    #[error("bucket weights must sum to 1.0 (got={sum})")]
    WeightsDoNotSumToOne { sum: f64 },
}

/// Options recognized by the round engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the betting window.
    pub betting_ms: u64,
    /// Coarse cadence used for human countdowns.
    pub coarse_tick_ms: u64,
    /// Fine cadence used for multiplier growth.
    pub fine_tick_ms: u64,
    /// Multiplier increment applied on every fine tick.
    pub multiplier_step: f64,
    /// Cool-down between rounds.
    pub cooldown_ms: u64,
    pub history_capacity: usize,
    pub escape_probability: f64,
    /// Targets below this value never escape.
    pub escape_floor: f64,
    /// Distance past the target at which an escaping round ends.
    pub escape_margin: f64,
    pub buckets: Vec<MultiplierBucket>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            betting_ms: 15_000,
            coarse_tick_ms: 1_000,
            fine_tick_ms: 100,
            multiplier_step: 0.01,
            cooldown_ms: 10_000,
            history_capacity: 12,
            escape_probability: 0.10,
            escape_floor: 3.0,
            escape_margin: 1.0,
            buckets: DEFAULT_BUCKETS.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Validate every option. The first violation found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("betting_ms", self.betting_ms),
            ("coarse_tick_ms", self.coarse_tick_ms),
            ("fine_tick_ms", self.fine_tick_ms),
            ("cooldown_ms", self.cooldown_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }
        if !self.multiplier_step.is_finite() || self.multiplier_step <= 0.0 {
            return Err(ConfigError::InvalidStep(self.multiplier_step));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        if !(0.0..=1.0).contains(&self.escape_probability) {
            return Err(ConfigError::EscapeProbabilityOutOfRange(
                self.escape_probability,
            ));
        }
        // NaN fails the comparison, so negate it.
        if !(self.escape_floor >= 1.0) {
            return Err(ConfigError::EscapeFloorBelowOne(self.escape_floor));
        }
        if !self.escape_margin.is_finite() || self.escape_margin < 0.0 {
            return Err(ConfigError::InvalidEscapeMargin(self.escape_margin));
        }
        self.validate_buckets()
    }

    fn validate_buckets(&self) -> Result<(), ConfigError> {
        if self.buckets.is_empty() {
            return Err(ConfigError::EmptyBucketTable);
        }
        let mut sum = 0.0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            let MultiplierBucket { weight, low, high } = *bucket;
            if !low.is_finite() || !high.is_finite() || low < 1.0 || high <= low {
                return Err(ConfigError::InvalidBucketRange { index, low, high });
            }
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ConfigError::InvalidBucketWeight { index, weight });
            }
            sum += weight;
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}
