//! Liftoff execution layer.
//!
//! This crate contains the deterministic round logic driven by the hosting
//! services: outcome generation, the phase clock, the history ledger and the
//! round phase engine that ties them together.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time here; every entry point takes `now_ms`.
//! - Only draw randomness through an [`OutcomeSampler`].
//! - Multiplier growth is a fixed step per fine tick, independent of timer jitter.
//!
//! The primary entrypoint is [`RoundEngine`].
//!
//! ## Driving a table (example)
//! ```rust
//! use liftoff_execution::RoundEngine;
//! use liftoff_types::{EngineConfig, Phase};
//!
//! let mut engine = RoundEngine::seeded(EngineConfig::default(), 42).unwrap();
//! let mut now_ms = 0;
//! engine.start(now_ms).unwrap();
//! assert_eq!(engine.phase(), Phase::BettingOpen);
//! engine.place_bet("alice", 100).unwrap();
//!
//! // The host fires whichever timer the engine asks for.
//! while engine.phase() != Phase::Running {
//!     let (handle, delay_ms) = engine.next_timer(now_ms).unwrap();
//!     now_ms += delay_ms;
//!     engine.on_timer(handle, now_ms);
//! }
//! assert!(engine.place_bet("bob", 100).is_err());
//! ```

pub mod clock;
pub mod engine;
pub mod history;
pub mod outcome;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use clock::{Cadence, ClockReading, PhaseClock, TimerHandle};
pub use engine::{EngineError, RoundEngine};
pub use history::{HistoryLedger, HistoryStats};
pub use outcome::{OutcomeGenerator, OutcomeSampler};
