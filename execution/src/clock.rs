//! Phase clock.
//!
//! Pure time arithmetic over caller-supplied `now_ms` values; the hosting
//! process owns the real timers and reports each firing back through
//! [`PhaseClock::tick`].
//!
//! At most one timer is live at a time. Starting a timer replaces the previous
//! one, which keeps the coarse countdown and the fine ticker mutually
//! exclusive. A handle that has been cancelled or replaced never produces
//! another reading.

use liftoff_types::EngineConfig;

/// Timing granularity of a timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// Human countdown cadence (betting window, cool-down).
    Coarse,
    /// Multiplier growth cadence.
    Fine,
}

/// Identifies one scheduled timer and the phase epoch it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
    epoch: u64,
    cadence: Cadence,
}

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }
}

/// Result of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockReading {
    pub elapsed_ms: u64,
    /// `None` for open-ended tickers. Never negative: floors at zero.
    pub remaining_ms: Option<u64>,
    /// True on exactly one reading per countdown.
    pub expired: bool,
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    handle: TimerHandle,
    started_at_ms: u64,
    duration_ms: Option<u64>,
}

impl Timer {
    fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.duration_ms
            .map(|duration| duration.saturating_sub(self.elapsed_ms(now_ms)))
    }
}

#[derive(Clone, Debug)]
pub struct PhaseClock {
    coarse_ms: u64,
    fine_ms: u64,
    next_id: u64,
    active: Option<Timer>,
}

impl PhaseClock {
    pub fn new(coarse_ms: u64, fine_ms: u64) -> Self {
        Self {
            coarse_ms,
            fine_ms,
            next_id: 1,
            active: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.coarse_tick_ms, config.fine_tick_ms)
    }

    pub fn interval_ms(&self, cadence: Cadence) -> u64 {
        match cadence {
            Cadence::Coarse => self.coarse_ms,
            Cadence::Fine => self.fine_ms,
        }
    }

    /// Start a countdown of `duration_ms` on the coarse cadence.
    pub fn start_countdown(&mut self, duration_ms: u64, now_ms: u64, epoch: u64) -> TimerHandle {
        self.start(Cadence::Coarse, Some(duration_ms), now_ms, epoch)
    }

    /// Start an open-ended ticker on the fine cadence.
    pub fn start_ticker(&mut self, now_ms: u64, epoch: u64) -> TimerHandle {
        self.start(Cadence::Fine, None, now_ms, epoch)
    }

    fn start(
        &mut self,
        cadence: Cadence,
        duration_ms: Option<u64>,
        now_ms: u64,
        epoch: u64,
    ) -> TimerHandle {
        let handle = TimerHandle {
            id: self.next_id,
            epoch,
            cadence,
        };
        self.next_id = self.next_id.saturating_add(1);
        self.active = Some(Timer {
            handle,
            started_at_ms: now_ms,
            duration_ms,
        });
        handle
    }

    /// Report a firing of `handle` at `now_ms`.
    ///
    /// Returns `None` if the handle is no longer live. A countdown that reports
    /// expiry is retired in the same call, so expiry is signalled once.
    pub fn tick(&mut self, handle: TimerHandle, now_ms: u64) -> Option<ClockReading> {
        let timer = self.active.filter(|timer| timer.handle == handle)?;
        let remaining_ms = timer.remaining_ms(now_ms);
        let expired = remaining_ms == Some(0);
        if expired {
            self.active = None;
        }
        Some(ClockReading {
            elapsed_ms: timer.elapsed_ms(now_ms),
            remaining_ms,
            expired,
        })
    }

    /// Cancel `handle`. Returns whether it was live.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        if self.active.is_some_and(|timer| timer.handle == handle) {
            self.active = None;
            return true;
        }
        false
    }

    pub fn cancel_all(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<TimerHandle> {
        self.active.map(|timer| timer.handle)
    }

    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        self.active.map(|timer| timer.elapsed_ms(now_ms))
    }

    /// Remaining time of the live countdown, if any.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.active.and_then(|timer| timer.remaining_ms(now_ms))
    }

    /// Live handle and how long the host should wait before firing it: one
    /// cadence interval, cut short so a countdown fires exactly at its deadline.
    pub fn next_delay_ms(&self, now_ms: u64) -> Option<(TimerHandle, u64)> {
        let timer = self.active?;
        let interval = self.interval_ms(timer.handle.cadence);
        let delay = match timer.remaining_ms(now_ms) {
            Some(remaining) => interval.min(remaining),
            None => interval,
        };
        Some((timer.handle, delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_floors_at_zero_and_expires_once() {
        let mut clock = PhaseClock::new(1_000, 100);
        let handle = clock.start_countdown(2_500, 10_000, 1);

        let reading = clock.tick(handle, 11_000).unwrap();
        assert_eq!(reading.remaining_ms, Some(1_500));
        assert!(!reading.expired);

        let reading = clock.tick(handle, 20_000).unwrap();
        assert_eq!(reading.elapsed_ms, 10_000);
        assert_eq!(reading.remaining_ms, Some(0));
        assert!(reading.expired);

        assert_eq!(clock.tick(handle, 21_000), None);
        assert_eq!(clock.active(), None);
    }

    #[test]
    fn test_cancel_silences_handle() {
        let mut clock = PhaseClock::new(1_000, 100);
        let handle = clock.start_countdown(5_000, 0, 1);
        assert!(clock.cancel(handle));
        assert!(!clock.cancel(handle));
        assert_eq!(clock.tick(handle, 5_000), None);
    }

    #[test]
    fn test_new_timer_replaces_previous() {
        let mut clock = PhaseClock::new(1_000, 100);
        let countdown = clock.start_countdown(5_000, 0, 1);
        let ticker = clock.start_ticker(1_000, 2);

        assert_eq!(clock.tick(countdown, 5_000), None);
        let reading = clock.tick(ticker, 1_100).unwrap();
        assert_eq!(reading.elapsed_ms, 100);
        assert_eq!(reading.remaining_ms, None);
        assert!(!reading.expired);
        assert_ne!(countdown.id(), ticker.id());
        assert_eq!(ticker.cadence(), Cadence::Fine);
        assert_eq!(ticker.epoch(), 2);
    }

    #[test]
    fn test_ticker_never_expires() {
        let mut clock = PhaseClock::new(1_000, 100);
        let ticker = clock.start_ticker(0, 1);
        for step in 1..=1_000u64 {
            let reading = clock.tick(ticker, step * 100).unwrap();
            assert!(!reading.expired);
        }
    }

    #[test]
    fn test_next_delay_respects_deadline() {
        let mut clock = PhaseClock::new(1_000, 100);
        assert_eq!(clock.next_delay_ms(0), None);

        let handle = clock.start_countdown(2_500, 0, 1);
        assert_eq!(clock.next_delay_ms(0), Some((handle, 1_000)));
        assert_eq!(clock.next_delay_ms(2_000), Some((handle, 500)));
        assert_eq!(clock.next_delay_ms(3_000), Some((handle, 0)));

        let ticker = clock.start_ticker(3_000, 2);
        assert_eq!(clock.next_delay_ms(3_000), Some((ticker, 100)));
    }

    #[test]
    fn test_clock_before_start_is_saturating() {
        let mut clock = PhaseClock::new(1_000, 100);
        let handle = clock.start_countdown(1_000, 5_000, 1);
        // A stale `now` earlier than the start must not underflow.
        let reading = clock.tick(handle, 4_000).unwrap();
        assert_eq!(reading.elapsed_ms, 0);
        assert_eq!(reading.remaining_ms, Some(1_000));
    }
}
