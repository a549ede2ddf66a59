//! Deterministic samplers for tests.

use std::collections::VecDeque;

use liftoff_types::RoundOutcome;

use crate::outcome::OutcomeSampler;

/// Replays a fixed list of outcomes, repeating the last one once exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedSampler {
    outcomes: VecDeque<RoundOutcome>,
    last: RoundOutcome,
}

impl ScriptedSampler {
    pub fn new(outcomes: impl IntoIterator<Item = RoundOutcome>) -> Self {
        let outcomes: VecDeque<RoundOutcome> = outcomes.into_iter().collect();
        let last = outcomes
            .back()
            .copied()
            .unwrap_or(RoundOutcome::crash(1.0));
        Self { outcomes, last }
    }

    /// Every round ends with `outcome`.
    pub fn repeating(outcome: RoundOutcome) -> Self {
        Self::new([outcome])
    }
}

impl OutcomeSampler for ScriptedSampler {
    fn sample(&mut self) -> RoundOutcome {
        self.outcomes.pop_front().unwrap_or(self.last)
    }
}

/// Crash at `target` every round.
pub fn crash_at(target: f64) -> ScriptedSampler {
    ScriptedSampler::repeating(RoundOutcome::crash(target))
}

/// Escape `margin` past `target` every round.
pub fn escape_at(target: f64, margin: f64) -> ScriptedSampler {
    ScriptedSampler::repeating(RoundOutcome::escape(target, margin))
}
