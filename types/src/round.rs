use std::fmt;

use serde::{Deserialize, Serialize};

/// Phase of a round.
///
/// Phases are strictly cyclic:
/// `BettingOpen -> BettingClosed -> Running -> Ended -> Waiting -> BettingOpen`.
/// `BettingClosed` and `Ended` are transient: they are entered and left within
/// the same engine step but are still reported to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    BettingOpen,
    BettingClosed,
    Running,
    Ended,
    Waiting,
}

impl Phase {
    /// One full round, in order.
    pub const CYCLE: [Phase; 5] = [
        Phase::BettingOpen,
        Phase::BettingClosed,
        Phase::Running,
        Phase::Ended,
        Phase::Waiting,
    ];

    /// The phase that always follows this one.
    pub fn next(self) -> Phase {
        match self {
            Phase::BettingOpen => Phase::BettingClosed,
            Phase::BettingClosed => Phase::Running,
            Phase::Running => Phase::Ended,
            Phase::Ended => Phase::Waiting,
            Phase::Waiting => Phase::BettingOpen,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BettingOpen => "bettingOpen",
            Phase::BettingClosed => "bettingClosed",
            Phase::Running => "running",
            Phase::Ended => "ended",
            Phase::Waiting => "waiting",
        }
    }

    /// Whether wagers may be placed during this phase.
    pub fn accepts_bets(self) -> bool {
        matches!(self, Phase::BettingOpen)
    }

    /// Whether this phase is timed by a countdown on the coarse cadence.
    pub fn is_countdown(self) -> bool {
        matches!(self, Phase::BettingOpen | Phase::Waiting)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminal {
    /// The live multiplier reached the hidden target.
    Crashed,
    /// The round flew past its target by the escape margin.
    Escaped,
}

impl Terminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::Crashed => "crashed",
            Terminal::Escaped => "escaped",
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single round.
///
/// Sampled once when the round starts running and kept private by the engine
/// until the round ends. `duration_ms` is zero until the engine stamps it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOutcome {
    pub target_multiplier: f64,
    pub will_escape: bool,
    pub final_multiplier: f64,
    pub duration_ms: u64,
    pub terminal: Terminal,
}

impl RoundOutcome {
    /// A round that crashes exactly at `target_multiplier`.
    pub fn crash(target_multiplier: f64) -> Self {
        Self {
            target_multiplier,
            will_escape: false,
            final_multiplier: target_multiplier,
            duration_ms: 0,
            terminal: Terminal::Crashed,
        }
    }

    /// A round that escapes `escape_margin` past `target_multiplier`.
    pub fn escape(target_multiplier: f64, escape_margin: f64) -> Self {
        Self {
            target_multiplier,
            will_escape: true,
            final_multiplier: target_multiplier + escape_margin,
            duration_ms: 0,
            terminal: Terminal::Escaped,
        }
    }

    /// Returns the outcome stamped with the wall-clock running time.
    pub fn with_duration(self, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..self
        }
    }
}

/// A completed round as recorded in the history ledger. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Monotonic ledger id (1-based).
    pub id: u64,
    pub round_id: u64,
    pub occurred_at_ms: u64,
    pub final_multiplier: f64,
    pub duration_ms: u64,
    pub terminal: Terminal,
}
