//! Liftoff domain types.
//!
//! Defines the round phases, outcomes, history entries, table events and the
//! construction-time configuration shared by the execution layer and the
//! hosting services.

pub mod config;
pub mod events;
pub mod round;

pub use config::{ConfigError, EngineConfig, MultiplierBucket, DEFAULT_BUCKETS};
pub use events::{BetReceipt, TableEvent, TableSnapshot};
pub use round::{HistoryEntry, Phase, RoundOutcome, Terminal};

#[cfg(test)]
mod tests;
