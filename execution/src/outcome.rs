//! Round outcome generation.
//!
//! A target multiplier is drawn from a weighted bucket table in two steps:
//! 1. A uniform `[0, 1)` draw selects the bucket by walking cumulative weights
//!    in table order.
//! 2. A second uniform draw places the value linearly within `[low, high)`.
//!
//! A third, independent draw decides whether the round escapes. Escapes are only
//! granted to targets at or above the configured eligibility floor.

use liftoff_types::{EngineConfig, MultiplierBucket, RoundOutcome};
use rand::{rngs::StdRng, Rng, RngCore, SeedableRng};

/// Source of round outcomes consumed by the engine.
///
/// Every outcome must have finite multipliers, a target of at least 1.0, a
/// terminal matching `will_escape`, a crash final equal to its target, and an
/// escape target at or above the configured floor. The engine panics on an
/// outcome that breaks any of these.
pub trait OutcomeSampler {
    /// Produce the hidden outcome for the next round.
    fn sample(&mut self) -> RoundOutcome;
}

/// Weighted-bucket outcome generator.
///
/// Pure with respect to its random source: sampling only consumes entropy.
#[derive(Clone, Debug)]
pub struct OutcomeGenerator<R> {
    buckets: Vec<MultiplierBucket>,
    escape_probability: f64,
    escape_floor: f64,
    escape_margin: f64,
    rng: R,
}

impl OutcomeGenerator<StdRng> {
    /// Generator backed by a seeded `StdRng`.
    pub fn seeded(config: &EngineConfig, seed: u64) -> Self {
        Self::new(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore> OutcomeGenerator<R> {
    /// The config is assumed to have been validated by the caller.
    pub fn new(config: &EngineConfig, rng: R) -> Self {
        Self {
            buckets: config.buckets.clone(),
            escape_probability: config.escape_probability,
            escape_floor: config.escape_floor,
            escape_margin: config.escape_margin,
            rng,
        }
    }

    /// Analytic mean of the target distribution (weight-averaged bucket midpoints).
    pub fn expected_target_mean(&self) -> f64 {
        self.buckets
            .iter()
            .map(|bucket| bucket.weight * bucket.midpoint())
            .sum()
    }

    /// Map a bucket draw and a value draw (both in `[0, 1)`) to a target multiplier.
    pub fn target_from_draws(&self, bucket_draw: f64, value_draw: f64) -> f64 {
        let bucket = self.select_bucket(bucket_draw);
        let value = bucket.low + value_draw * (bucket.high - bucket.low);
        // Rounding can land a draw just under 1.0 on `high`, which the bucket excludes.
        value.max(bucket.low).min(largest_below(bucket.high))
    }

    /// Build the full outcome from three uniform draws.
    pub fn outcome_from_draws(
        &self,
        bucket_draw: f64,
        value_draw: f64,
        escape_draw: f64,
    ) -> RoundOutcome {
        let target = self.target_from_draws(bucket_draw, value_draw);
        if escape_draw < self.escape_probability && target >= self.escape_floor {
            RoundOutcome::escape(target, self.escape_margin)
        } else {
            RoundOutcome::crash(target)
        }
    }

    fn select_bucket(&self, draw: f64) -> MultiplierBucket {
        let mut cumulative = 0.0;
        for bucket in &self.buckets {
            cumulative += bucket.weight;
            if draw < cumulative {
                return *bucket;
            }
        }
        // Weights may sum to slightly under 1.0; the remainder belongs to the last bucket.
        self.buckets
            .last()
            .copied()
            .unwrap_or(MultiplierBucket::new(1.0, 1.0, 1.0))
    }
}

/// Largest `f64` strictly below a positive finite `value`.
fn largest_below(value: f64) -> f64 {
    f64::from_bits(value.to_bits() - 1)
}

impl<R: RngCore> OutcomeSampler for OutcomeGenerator<R> {
    fn sample(&mut self) -> RoundOutcome {
        let bucket_draw: f64 = self.rng.gen();
        let value_draw: f64 = self.rng.gen();
        let escape_draw: f64 = self.rng.gen();
        self.outcome_from_draws(bucket_draw, value_draw, escape_draw)
    }
}
