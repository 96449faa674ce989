//! Concurrent countdown handle around a [`PhaseCycle`].
//!
//! A running engine owns exactly one background loop that sleeps for one
//! [`TICK`], ticks the cycle, persists a session record when a work phase
//! ends and then publishes the produced events. `stop()` only clears the
//! running flag; the loop notices at its next wake and exits, so the worst
//! case cancellation latency is one tick.
//!
//! Each `start()` bumps a generation counter that the loop checks on every
//! wake. A loop from an earlier generation exits even if the engine was
//! restarted before it woke, so there is never more than one loop ticking.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::config::{TimerConfig, TimerId};
use super::cycle::{PhaseCycle, TimerSnapshot};
use super::phase::{PhaseDurations, TimerPhase};
use crate::clock::{Clock, TICK};
use crate::error::Result;
use crate::notify::{dispatch, Notifier};
use crate::storage::PersistenceGateway;

/// Collaborators an engine publishes to.
#[derive(Clone)]
pub struct EngineContext {
    pub gateway: Arc<dyn PersistenceGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Roll straight into the next phase when one completes.
    pub auto_continue: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            auto_continue: true,
        }
    }
}

#[derive(Debug)]
struct Shared {
    cycle: PhaseCycle,
    generation: u64,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
pub struct TimerEngine {
    shared: Arc<Mutex<Shared>>,
    ctx: EngineContext,
    loops: Vec<JoinHandle<()>>,
}

impl TimerEngine {
    /// Build an idle engine at the start of a work phase.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a zero duration or an interval below 1.
    pub fn new(
        id: TimerId,
        config: &TimerConfig,
        options: EngineOptions,
        ctx: EngineContext,
    ) -> Result<Self> {
        let cycle = PhaseCycle::new(id, config, options.auto_continue)?;
        Ok(Self {
            shared: Arc::new(Mutex::new(Shared {
                cycle,
                generation: 0,
            })),
            ctx,
            loops: Vec::new(),
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> TimerId {
        lock(&self.shared).cycle.id()
    }

    pub fn name(&self) -> String {
        lock(&self.shared).cycle.name().to_string()
    }

    pub fn phase(&self) -> TimerPhase {
        lock(&self.shared).cycle.phase()
    }

    pub fn remaining(&self) -> Duration {
        lock(&self.shared).cycle.remaining()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.shared).cycle.is_running()
    }

    pub fn completed_work_phases(&self) -> u32 {
        lock(&self.shared).cycle.completed_work_phases()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        lock(&self.shared).cycle.snapshot()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down. Returns `false` (and does nothing) when already
    /// running or when the current phase has no time left.
    ///
    /// # Panics
    /// When called outside a Tokio runtime.
    pub fn start(&mut self) -> bool {
        let (event, generation) = {
            let mut guard = lock(&self.shared);
            let Some(event) = guard.cycle.start(self.ctx.clock.now()) else {
                return false;
            };
            guard.generation += 1;
            (event, guard.generation)
        };
        debug!(timer = %self.id(), generation, "countdown started");
        dispatch(self.ctx.notifier.as_ref(), &event);

        self.loops.retain(|h| !h.is_finished());
        let shared = Arc::clone(&self.shared);
        let ctx = self.ctx.clone();
        self.loops
            .push(tokio::spawn(run_countdown(shared, ctx, generation)));
        true
    }

    /// Clear the running flag. The loop exits at its next wake.
    pub fn stop(&mut self) -> bool {
        let event = lock(&self.shared).cycle.stop(self.ctx.clock.now());
        match event {
            Some(event) => {
                dispatch(self.ctx.notifier.as_ref(), &event);
                true
            }
            None => false,
        }
    }

    /// Stop and refill the current phase.
    pub fn reset(&mut self) {
        let event = lock(&self.shared).cycle.reset(self.ctx.clock.now());
        dispatch(self.ctx.notifier.as_ref(), &event);
    }

    /// Replace durations and interval; the engine stops and starts over at
    /// a fresh work phase.
    pub fn reconfigure(&mut self, durations: PhaseDurations, long_break_interval: u32) -> Result<()> {
        let event = lock(&self.shared).cycle.reconfigure(
            durations,
            long_break_interval,
            self.ctx.clock.now(),
        )?;
        dispatch(self.ctx.notifier.as_ref(), &event);
        Ok(())
    }

    /// Stop and wait for every countdown loop of this engine to exit.
    pub async fn shutdown(&mut self) {
        self.stop();
        for handle in self.loops.drain(..) {
            if let Err(e) = handle.await {
                warn!("countdown loop ended abnormally: {e}");
            }
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        let now = self.ctx.clock.now();
        lock(&self.shared).cycle.stop(now);
    }
}

async fn run_countdown(shared: Arc<Mutex<Shared>>, ctx: EngineContext, generation: u64) {
    loop {
        tokio::time::sleep(TICK).await;

        let outcome = {
            let mut guard = lock(&shared);
            if guard.generation != generation || !guard.cycle.is_running() {
                break;
            }
            guard.cycle.tick(ctx.clock.now())
        };

        if let Some(session) = &outcome.session {
            if let Err(e) = ctx.gateway.append_session_record(session) {
                error!("failed to record completed session: {e}");
            }
        }
        for event in &outcome.events {
            dispatch(ctx.notifier.as_ref(), event);
        }
    }
    debug!(generation, "countdown loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::events::Event;
    use crate::notify::{ChannelNotifier, NullNotifier};
    use crate::stats::DateRange;
    use crate::storage::Database;
    use chrono::NaiveDate;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn config(name: &str, work: u64, short: u64, long: u64, interval: u32) -> TimerConfig {
        TimerConfig::new(
            name,
            PhaseDurations::from_secs(work, short, long).unwrap(),
            interval,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        )
    }

    fn context(db: Arc<Database>) -> (EngineContext, UnboundedReceiver<Event>) {
        let (notifier, rx) = ChannelNotifier::new();
        let ctx = EngineContext {
            gateway: db,
            notifier: Arc::new(notifier),
            clock: Arc::new(SystemClock),
        };
        (ctx, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_second() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, mut rx) = context(db);
        let mut engine =
            TimerEngine::new(TimerId(1), &config("a", 10, 5, 5, 4), EngineOptions::default(), ctx)
                .unwrap();

        assert!(engine.start());
        assert!(!engine.start(), "second start is a no-op");
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(engine.remaining(), Duration::from_secs(7));

        let ticks = drain(&mut rx).iter().filter(|e| e.is_tick()).count();
        assert_eq!(ticks, 3);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_then_start_within_a_tick_keeps_one_loop() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, _rx) = context(db);
        let mut engine =
            TimerEngine::new(TimerId(1), &config("a", 100, 5, 5, 4), EngineOptions::default(), ctx)
                .unwrap();

        engine.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        engine.stop();
        engine.start();
        tokio::time::sleep(Duration::from_millis(3200)).await;
        // 1 tick before the restart, then exactly one tick per second after it.
        assert_eq!(engine.remaining(), Duration::from_secs(100 - 1 - 3));
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_engine_stays_put() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, _rx) = context(db);
        let mut engine =
            TimerEngine::new(TimerId(1), &config("a", 100, 5, 5, 4), EngineOptions::default(), ctx)
                .unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        engine.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.remaining(), Duration::from_secs(98));
        assert!(!engine.is_running());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn completed_work_phase_is_recorded_then_announced() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, mut rx) = context(Arc::clone(&db));
        let mut engine =
            TimerEngine::new(TimerId(5), &config("a", 2, 3, 4, 4), EngineOptions::default(), ctx)
                .unwrap();

        engine.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(engine.phase(), TimerPhase::ShortBreak);
        assert!(engine.is_running());

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            Event::PhaseCompleted { from: TimerPhase::Work, to: TimerPhase::ShortBreak, .. }
        )));
        let stats = db.query_pomodoro_stats(&DateRange::all_time()).unwrap();
        assert_eq!(stats.session_count, 1);
        assert_eq!(stats.total_duration_secs, 2);
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_mode_halts_between_phases() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, _rx) = context(db);
        let mut engine = TimerEngine::new(
            TimerId(1),
            &config("a", 1, 3, 4, 4),
            EngineOptions {
                auto_continue: false,
            },
            ctx,
        )
        .unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.phase(), TimerPhase::ShortBreak);
        assert_eq!(engine.remaining(), Duration::from_secs(3));
        assert!(!engine.is_running());
        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn two_engines_are_independent() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (ctx, _rx) = context(db);
        let mut a = TimerEngine::new(
            TimerId(1),
            &config("a", 100, 5, 5, 4),
            EngineOptions::default(),
            ctx.clone(),
        )
        .unwrap();
        let mut b =
            TimerEngine::new(TimerId(2), &config("b", 50, 5, 5, 4), EngineOptions::default(), ctx)
                .unwrap();

        a.start();
        b.start();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        a.stop();
        let b_phase = b.phase();
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert_eq!(a.remaining(), Duration::from_secs(98));
        assert_eq!(b.remaining(), Duration::from_secs(45));
        assert_eq!(b.phase(), b_phase);
        assert!(b.is_running());
        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_and_refills() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let ctx = EngineContext {
            gateway: db,
            notifier: Arc::new(NullNotifier),
            clock: Arc::new(SystemClock),
        };
        let mut engine =
            TimerEngine::new(TimerId(1), &config("a", 10, 5, 5, 4), EngineOptions::default(), ctx)
                .unwrap();
        engine.start();
        tokio::time::sleep(Duration::from_millis(4500)).await;
        engine.reset();
        assert!(!engine.is_running());
        assert_eq!(engine.remaining(), Duration::from_secs(10));
        engine.shutdown().await;
    }
}
