//! Round phase engine.
//!
//! Drives one table through the cycle
//! `BettingOpen -> BettingClosed -> Running -> Ended -> Waiting -> BettingOpen`.
//!
//! ## Epoch guard
//!
//! Every phase entry increments `epoch`. Timers are scheduled with the epoch
//! current at scheduling time and a firing whose epoch no longer matches is a
//! no-op. The same guard makes [`RoundEngine::force_advance`] idempotent: of
//! several callers racing to end a phase, only the first one for a given
//! epoch performs the transition.
//!
//! ## Time
//!
//! The engine never reads a clock. Callers pass `now_ms` (milliseconds since
//! the Unix epoch) into every entry point, keeping the state machine
//! deterministic and testable.

use liftoff_types::{
    BetReceipt, ConfigError, EngineConfig, HistoryEntry, Phase, RoundOutcome, TableEvent,
    TableSnapshot, Terminal,
};
use rand::rngs::StdRng;
use thiserror::Error as ThisError;
use tracing::{debug, info};

use crate::clock::{PhaseClock, TimerHandle};
use crate::history::{HistoryLedger, HistoryStats};
use crate::outcome::{OutcomeGenerator, OutcomeSampler};

/// Slack applied when comparing the live multiplier against the end point.
const MULTIPLIER_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum EngineError {
    #[error("{action} is not allowed while {phase}")]
    InvalidPhaseAction { action: &'static str, phase: Phase },
    #[error("stale timer ignored (timer epoch={timer_epoch}, current epoch={current_epoch})")]
    TimerRaceIgnored { timer_epoch: u64, current_epoch: u64 },
    #[error("bet amount must be greater than zero")]
    InvalidBetAmount,
    #[error("engine stopped")]
    Stopped,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Round engine for a single table.
///
/// Sole owner of its state: every mutation happens inside its own entry
/// points. Readers get owned snapshots.
#[derive(Debug)]
pub struct RoundEngine<S> {
    config: EngineConfig,
    sampler: S,
    clock: PhaseClock,
    history: HistoryLedger,
    started: bool,
    stopped: bool,
    round_id: u64,
    phase: Phase,
    epoch: u64,
    phase_started_at_ms: u64,
    running_started_at_ms: u64,
    ticks: u64,
    live_multiplier: f64,
    outcome: Option<RoundOutcome>,
    last_terminal: Option<Terminal>,
    pending_bets: Vec<BetReceipt>,
    next_bet_id: u64,
}

impl RoundEngine<OutcomeGenerator<StdRng>> {
    /// Engine using the weighted-bucket generator seeded with `seed`.
    pub fn seeded(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        let generator = OutcomeGenerator::seeded(&config, seed);
        Self::new(config, generator)
    }
}

impl<S: OutcomeSampler> RoundEngine<S> {
    /// Build an engine. Refuses to build on invalid configuration.
    pub fn new(config: EngineConfig, sampler: S) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            clock: PhaseClock::from_config(&config),
            history: HistoryLedger::new(config.history_capacity),
            config,
            sampler,
            started: false,
            stopped: false,
            round_id: 0,
            phase: Phase::Waiting,
            epoch: 0,
            phase_started_at_ms: 0,
            running_started_at_ms: 0,
            ticks: 0,
            live_multiplier: 1.0,
            outcome: None,
            last_terminal: None,
            pending_bets: Vec::new(),
            next_bet_id: 1,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Live multiplier, only meaningful while `Running`.
    pub fn live_multiplier(&self) -> Option<f64> {
        (self.phase == Phase::Running).then_some(self.live_multiplier)
    }

    /// Terminal of the most recent round until the next betting window opens.
    pub fn last_terminal(&self) -> Option<Terminal> {
        self.last_terminal
    }

    /// Bets accepted for the current round.
    pub fn pending_bets(&self) -> &[BetReceipt] {
        &self.pending_bets
    }

    /// Copy of the history ledger, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.snapshot()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// The live timer and the delay after which the host should fire it.
    pub fn next_timer(&self, now_ms: u64) -> Option<(TimerHandle, u64)> {
        if self.stopped {
            return None;
        }
        self.clock.next_delay_ms(now_ms)
    }

    pub fn snapshot(&self, now_ms: u64) -> TableSnapshot {
        let time_remaining_ms = if self.phase.is_countdown() {
            self.clock.remaining_ms(now_ms)
        } else {
            None
        };
        TableSnapshot {
            round_id: self.round_id,
            phase: self.phase,
            epoch: self.epoch,
            phase_started_at_ms: self.phase_started_at_ms,
            time_remaining_ms,
            live_multiplier: self.live_multiplier(),
            pending_bets: self.pending_bets.clone(),
            history: self.history.snapshot(),
        }
    }

    /// Open the first betting window.
    pub fn start(&mut self, now_ms: u64) -> Result<Vec<TableEvent>, EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped);
        }
        if self.started {
            return Err(EngineError::InvalidPhaseAction {
                action: "start",
                phase: self.phase,
            });
        }
        self.started = true;
        self.round_id = 1;
        let mut events = Vec::new();
        self.enter(Phase::BettingOpen, now_ms, &mut events);
        Ok(events)
    }

    /// Accept a wager. Only legal while `BettingOpen`; never alters state on rejection.
    pub fn place_bet(
        &mut self,
        player: impl Into<String>,
        amount: u64,
    ) -> Result<BetReceipt, EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped);
        }
        if !self.started || !self.phase.accepts_bets() {
            return Err(EngineError::InvalidPhaseAction {
                action: "place_bet",
                phase: self.phase,
            });
        }
        if amount == 0 {
            return Err(EngineError::InvalidBetAmount);
        }
        let receipt = BetReceipt {
            bet_id: self.next_bet_id,
            round_id: self.round_id,
            player: player.into(),
            amount,
        };
        self.next_bet_id = self.next_bet_id.saturating_add(1);
        self.pending_bets.push(receipt.clone());
        Ok(receipt)
    }

    /// Deliver a timer firing. Stale or cancelled timers are dropped silently.
    ///
    /// # Panics
    ///
    /// When the round opened by this firing receives an invalid outcome from
    /// the sampler (see [`OutcomeSampler`]). The same holds for [`Self::force_advance`].
    pub fn on_timer(&mut self, handle: TimerHandle, now_ms: u64) -> Vec<TableEvent> {
        match self.fire(handle, now_ms) {
            Ok(events) => events,
            Err(EngineError::TimerRaceIgnored {
                timer_epoch,
                current_epoch,
            }) => {
                debug!(timer_epoch, current_epoch, "stale timer ignored");
                Vec::new()
            }
            Err(err) => {
                debug!(?err, "timer dropped");
                Vec::new()
            }
        }
    }

    /// End the current countdown early.
    ///
    /// `epoch` is the epoch the caller observed. Calls carrying an old epoch
    /// lost the race to another transition and are dropped.
    pub fn force_advance(
        &mut self,
        epoch: u64,
        now_ms: u64,
    ) -> Result<Vec<TableEvent>, EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped);
        }
        if !self.started {
            return Err(EngineError::InvalidPhaseAction {
                action: "force_advance",
                phase: self.phase,
            });
        }
        if epoch != self.epoch {
            debug!(epoch, current_epoch = self.epoch, "duplicate advance dropped");
            return Ok(Vec::new());
        }
        match self.phase {
            Phase::BettingOpen | Phase::Waiting => {
                let mut events = Vec::new();
                self.expire_countdown(now_ms, &mut events);
                Ok(events)
            }
            phase @ (Phase::BettingClosed | Phase::Running | Phase::Ended) => {
                Err(EngineError::InvalidPhaseAction {
                    action: "force_advance",
                    phase,
                })
            }
        }
    }

    /// Cancel all timers and refuse any further phase entry. Idempotent.
    pub fn force_stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.clock.cancel_all();
        self.epoch = self.epoch.saturating_add(1);
        info!(round_id = self.round_id, phase = %self.phase, "engine stopped");
    }

    fn fire(&mut self, handle: TimerHandle, now_ms: u64) -> Result<Vec<TableEvent>, EngineError> {
        if self.stopped {
            return Err(EngineError::Stopped);
        }
        let stale = EngineError::TimerRaceIgnored {
            timer_epoch: handle.epoch(),
            current_epoch: self.epoch,
        };
        if handle.epoch() != self.epoch {
            return Err(stale);
        }
        let reading = self.clock.tick(handle, now_ms).ok_or(stale)?;

        let mut events = Vec::new();
        match self.phase {
            Phase::BettingOpen | Phase::Waiting => {
                events.push(TableEvent::Countdown {
                    phase: self.phase,
                    remaining_ms: reading.remaining_ms.unwrap_or(0),
                });
                if reading.expired {
                    self.expire_countdown(now_ms, &mut events);
                }
            }
            Phase::Running => self.tick_multiplier(now_ms, &mut events),
            // Transient phases never own a timer.
            Phase::BettingClosed | Phase::Ended => {}
        }
        Ok(events)
    }

    fn expire_countdown(&mut self, now_ms: u64, events: &mut Vec<TableEvent>) {
        match self.phase {
            Phase::BettingOpen => {
                self.enter(Phase::BettingClosed, now_ms, events);
                self.enter(Phase::Running, now_ms, events);
            }
            Phase::Waiting => {
                self.round_id = self.round_id.saturating_add(1);
                self.enter(Phase::BettingOpen, now_ms, events);
            }
            Phase::BettingClosed | Phase::Running | Phase::Ended => {}
        }
    }

    fn tick_multiplier(&mut self, now_ms: u64, events: &mut Vec<TableEvent>) {
        let Some(outcome) = self.outcome else {
            return;
        };
        self.ticks = self.ticks.saturating_add(1);
        self.live_multiplier = 1.0 + self.ticks as f64 * self.config.multiplier_step;

        let finished = self.live_multiplier + MULTIPLIER_EPSILON >= outcome.final_multiplier;
        if finished && !outcome.will_escape {
            self.live_multiplier = outcome.target_multiplier;
        }
        events.push(TableEvent::MultiplierTick {
            value: self.live_multiplier,
        });
        if finished {
            self.finish_round(outcome, now_ms, events);
        }
    }

    fn finish_round(&mut self, outcome: RoundOutcome, now_ms: u64, events: &mut Vec<TableEvent>) {
        self.enter(Phase::Ended, now_ms, events);

        let duration_ms = now_ms.saturating_sub(self.running_started_at_ms);
        let outcome = outcome.with_duration(duration_ms);
        let entry = self.history.record(self.round_id, now_ms, &outcome);
        self.last_terminal = Some(outcome.terminal);
        self.outcome = None;
        info!(
            round_id = self.round_id,
            terminal = %outcome.terminal,
            final_multiplier = outcome.final_multiplier,
            duration_ms,
            "round ended"
        );
        events.push(TableEvent::RoundEnded {
            round_id: self.round_id,
            terminal: outcome.terminal,
            final_multiplier: outcome.final_multiplier,
            duration_ms,
        });
        events.push(TableEvent::HistoryAppended { entry });

        self.enter(Phase::Waiting, now_ms, events);
    }

    /// First broken outcome invariant, if any. A sampler that breaks one is a
    /// defect: running the round would tick below 1.0 or never finish.
    fn outcome_defect(&self, outcome: &RoundOutcome) -> Option<&'static str> {
        if !outcome.target_multiplier.is_finite() || !outcome.final_multiplier.is_finite() {
            return Some("non-finite multiplier");
        }
        if outcome.target_multiplier < 1.0 {
            return Some("target below 1.0");
        }
        if outcome.final_multiplier < outcome.target_multiplier {
            return Some("final below target");
        }
        if outcome.will_escape != (outcome.terminal == Terminal::Escaped) {
            return Some("terminal disagrees with escape flag");
        }
        if outcome.will_escape && outcome.target_multiplier < self.config.escape_floor {
            return Some("escape below the eligibility floor");
        }
        if !outcome.will_escape && outcome.final_multiplier != outcome.target_multiplier {
            return Some("crash final differs from target");
        }
        None
    }

    fn enter(&mut self, phase: Phase, now_ms: u64, events: &mut Vec<TableEvent>) {
        self.epoch = self.epoch.saturating_add(1);
        self.clock.cancel_all();
        self.phase = phase;
        self.phase_started_at_ms = now_ms;
        info!(round_id = self.round_id, %phase, epoch = self.epoch, "phase entered");
        events.push(TableEvent::PhaseChanged {
            round_id: self.round_id,
            phase,
            entered_at_ms: now_ms,
        });

        match phase {
            Phase::BettingOpen => {
                self.ticks = 0;
                self.live_multiplier = 1.0;
                self.last_terminal = None;
                self.pending_bets.clear();
                self.clock
                    .start_countdown(self.config.betting_ms, now_ms, self.epoch);
            }
            Phase::BettingClosed => {}
            Phase::Running => {
                let outcome = self.sampler.sample();
                if let Some(defect) = self.outcome_defect(&outcome) {
                    panic!("sampler produced an invalid outcome ({defect}): {outcome:?}");
                }
                self.outcome = Some(outcome);
                self.running_started_at_ms = now_ms;
                self.clock.start_ticker(now_ms, self.epoch);
            }
            Phase::Ended => {}
            Phase::Waiting => {
                self.clock
                    .start_countdown(self.config.cooldown_ms, now_ms, self.epoch);
            }
        }
    }
}
