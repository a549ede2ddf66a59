//! Live table host.
//!
//! Owns one [`RoundEngine`] behind a mutex and a driver task that fires the
//! engine's timers on the tokio clock. Every engine call, whether from the
//! driver or from a command, runs under the same lock and publishes its events
//! before releasing it, so subscribers observe events in engine order.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use liftoff_execution::{EngineError, HistoryStats, OutcomeSampler, RoundEngine};
use liftoff_types::{BetReceipt, HistoryEntry, TableEvent, TableSnapshot};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

struct TableState<S> {
    engine: RoundEngine<S>,
    subscribers: Vec<mpsc::UnboundedSender<TableEvent>>,
}

impl<S> TableState<S> {
    fn publish(&mut self, events: Vec<TableEvent>) {
        if events.is_empty() {
            return;
        }
        let before = self.subscribers.len();
        self.subscribers.retain(|subscriber| {
            events
                .iter()
                .all(|event| subscriber.send(event.clone()).is_ok())
        });
        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            warn!(pruned, "dropped closed subscribers");
        }
    }
}

struct Shared<S> {
    state: Mutex<TableState<S>>,
    /// Set when a command moved the engine to a new timer.
    rescheduled: Notify,
    shutdown: watch::Sender<bool>,
    wall_origin_ms: u64,
    origin: Instant,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, TableState<S>> {
        // Poisoned only if an engine call panicked.
        self.state.lock().expect("live table state poisoned")
    }

    /// Wall-clock milliseconds, advanced by the tokio clock.
    fn now_ms(&self) -> u64 {
        let elapsed = u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.wall_origin_ms.saturating_add(elapsed)
    }
}

/// Handle to a running table.
pub struct LiveTable<S> {
    shared: Arc<Shared<S>>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl<S: OutcomeSampler + Send + 'static> LiveTable<S> {
    /// Wrap `engine` and spawn its driver task. Must be called within a tokio runtime.
    ///
    /// The table stays idle until [`LiveTable::start`], so subscribers added
    /// in between see the very first phase change.
    pub fn new(engine: RoundEngine<S>) -> Self {
        let wall_origin_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: Mutex::new(TableState {
                engine,
                subscribers: Vec::new(),
            }),
            rescheduled: Notify::new(),
            shutdown,
            wall_origin_ms,
            origin: Instant::now(),
        });
        let driver = tokio::spawn(drive(Arc::clone(&shared), shutdown_rx));
        Self {
            shared,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// Register a subscriber. Its queue is unbounded and never drops events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TableEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.lock().subscribers.push(tx);
        rx
    }

    /// Open the first betting window.
    pub fn start(&self) -> Result<(), EngineError> {
        let now_ms = self.shared.now_ms();
        let mut state = self.shared.lock();
        let events = state.engine.start(now_ms)?;
        state.publish(events);
        drop(state);
        self.shared.rescheduled.notify_one();
        Ok(())
    }

    pub fn place_bet(
        &self,
        player: impl Into<String>,
        amount: u64,
    ) -> Result<BetReceipt, EngineError> {
        let mut state = self.shared.lock();
        let result = state.engine.place_bet(player, amount);
        match &result {
            Ok(receipt) => debug!(bet_id = receipt.bet_id, round_id = receipt.round_id, "bet accepted"),
            Err(err) => debug!(%err, "bet rejected"),
        }
        result
    }

    /// End the current countdown early. Returns whether this call performed
    /// the transition; `false` means another caller already did for `epoch`.
    pub fn force_advance(&self, epoch: u64) -> Result<bool, EngineError> {
        let now_ms = self.shared.now_ms();
        let mut state = self.shared.lock();
        let events = state.engine.force_advance(epoch, now_ms)?;
        let advanced = !events.is_empty();
        state.publish(events);
        drop(state);
        if advanced {
            self.shared.rescheduled.notify_one();
        }
        Ok(advanced)
    }

    pub fn snapshot(&self) -> TableSnapshot {
        let now_ms = self.shared.now_ms();
        self.shared.lock().engine.snapshot(now_ms)
    }

    /// Newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared.lock().engine.history()
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.shared.lock().engine.history_stats()
    }

    /// Cancel all timers, stop the driver and close every subscriber queue.
    ///
    /// The in-flight round is abandoned. Safe to call more than once.
    pub async fn force_stop(&self) {
        {
            let mut state = self.shared.lock();
            state.engine.force_stop();
            state.subscribers.clear();
        }
        self.shared.shutdown.send_replace(true);

        let driver = self
            .driver
            .lock()
            .expect("live table driver poisoned")
            .take();
        if let Some(driver) = driver {
            if let Err(err) = driver.await {
                if err.is_panic() {
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }
    }
}

impl<S> Drop for LiveTable<S> {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
    }
}

/// Fire the engine's timers until shutdown.
async fn drive<S: OutcomeSampler>(shared: Arc<Shared<S>>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = shared.lock().engine.next_timer(shared.now_ms());
        let sleep = async {
            match next {
                Some((_, delay_ms)) => time::sleep(Duration::from_millis(delay_ms)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = shared.rescheduled.notified() => {}
            _ = sleep => {
                let Some((handle, _)) = next else {
                    continue;
                };
                let now_ms = shared.now_ms();
                let mut state = shared.lock();
                let events = state.engine.on_timer(handle, now_ms);
                state.publish(events);
            }
        }
    }
    info!("live table driver stopped");
}
