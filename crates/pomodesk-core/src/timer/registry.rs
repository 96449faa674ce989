//! The set of named timers for the selected day.
//!
//! The registry is the only writer of its engine collection; every mutation
//! goes through `&mut self`. Engines write completed sessions straight to
//! the gateway and never reach back into the registry.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::config::{TimerConfig, TimerId};
use super::cycle::TimerSnapshot;
use super::engine::{EngineContext, EngineOptions, TimerEngine};
use super::phase::PhaseDurations;
use crate::error::{CoreError, DatabaseError, Result};

#[derive(Debug)]
struct Slot {
    config: TimerConfig,
    engine: TimerEngine,
}

#[derive(Debug)]
pub struct TimerRegistry {
    ctx: EngineContext,
    options: EngineOptions,
    active_date: NaiveDate,
    slots: Vec<Slot>,
}

impl TimerRegistry {
    /// Open on today's date with every stored timer idle at a fresh work
    /// phase.
    pub fn load(ctx: EngineContext, options: EngineOptions) -> Result<Self> {
        let active_date = ctx.clock.today();
        let slots = build_slots(&ctx, options, active_date)?;
        Ok(Self {
            ctx,
            options,
            active_date,
            slots,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn active_date(&self) -> NaiveDate {
        self.active_date
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: TimerId) -> Option<&TimerEngine> {
        self.slot(id).map(|s| &s.engine)
    }

    pub fn config(&self, id: TimerId) -> Option<&TimerConfig> {
        self.slot(id).map(|s| &s.config)
    }

    pub fn find_by_name(&self, name: &str) -> Option<TimerId> {
        self.slots
            .iter()
            .find(|s| s.config.name == name)
            .map(|s| s.engine.id())
    }

    pub fn configs(&self) -> impl Iterator<Item = &TimerConfig> {
        self.slots.iter().map(|s| &s.config)
    }

    /// Creation order.
    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        self.slots.iter().map(|s| s.engine.snapshot()).collect()
    }

    pub fn any_running(&self) -> bool {
        self.slots.iter().any(|s| s.engine.is_running())
    }

    /// Every date with stored data plus today, newest first, no repeats.
    pub fn list_available_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dates = self.ctx.gateway.list_distinct_dates()?;
        dates.push(self.ctx.clock.today());
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates.dedup();
        Ok(dates)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch to another day. Every engine of the old day is stopped and
    /// joined; the new day's timers start idle.
    ///
    /// On a gateway failure the old day stays selected and untouched.
    pub async fn select_date(&mut self, date: NaiveDate) -> Result<()> {
        let slots = build_slots(&self.ctx, self.options, date)?;
        let old = std::mem::replace(&mut self.slots, slots);
        for mut slot in old {
            slot.engine.shutdown().await;
        }
        info!(from = %self.active_date, to = %date, timers = self.slots.len(), "selected date");
        self.active_date = date;
        Ok(())
    }

    /// Create and persist a timer on the active date.
    ///
    /// # Errors
    /// `DuplicateName` when the name is taken on that date, `Validation` or
    /// `InvalidConfiguration` for bad input, `Persistence` when the write
    /// fails (nothing is added in that case).
    pub fn create_timer(
        &mut self,
        name: &str,
        durations: PhaseDurations,
        long_break_interval: u32,
    ) -> Result<TimerId> {
        let name = name.trim();
        let mut config = TimerConfig::new(name, durations, long_break_interval, self.active_date);
        config.validate()?;
        if self.find_by_name(name).is_some() {
            return Err(self.duplicate(name));
        }

        let id = match self.ctx.gateway.save_timer_config(&config) {
            Ok(id) => id,
            Err(DatabaseError::Constraint(_)) => return Err(self.duplicate(name)),
            Err(e) => return Err(e.into()),
        };
        config.id = Some(id);
        let engine = TimerEngine::new(id, &config, self.options, self.ctx.clone())?;
        debug!(%id, name, date = %self.active_date, "created timer");
        self.slots.push(Slot { config, engine });
        Ok(id)
    }

    /// Persist new durations and interval, then restart the timer at a
    /// fresh work phase with them.
    pub fn update_timer(
        &mut self,
        id: TimerId,
        durations: PhaseDurations,
        long_break_interval: u32,
    ) -> Result<()> {
        let index = self.index_of(id)?;
        let mut config = self.slots[index].config.clone();
        config.durations = durations;
        config.long_break_interval = long_break_interval;
        config.validate()?;

        self.ctx.gateway.update_timer_config(&config)?;
        let slot = &mut self.slots[index];
        slot.engine.reconfigure(durations, long_break_interval)?;
        slot.config = config;
        Ok(())
    }

    /// Delete the stored config, then stop the timer and drop it.
    ///
    /// When the delete fails the timer stays registered and keeps running.
    pub async fn delete_timer(&mut self, id: TimerId) -> Result<()> {
        let index = self.index_of(id)?;
        let config = &self.slots[index].config;
        self.ctx
            .gateway
            .delete_timer_config(&config.name, config.date)?;

        let mut slot = self.slots.remove(index);
        slot.engine.stop();
        slot.engine.shutdown().await;
        debug!(%id, name = %slot.config.name, "deleted timer");
        Ok(())
    }

    /// Returns `false` when the timer was already running.
    pub fn start(&mut self, id: TimerId) -> Result<bool> {
        Ok(self.engine_mut(id)?.start())
    }

    /// Returns `false` when the timer was not running.
    pub fn stop(&mut self, id: TimerId) -> Result<bool> {
        Ok(self.engine_mut(id)?.stop())
    }

    pub fn reset(&mut self, id: TimerId) -> Result<()> {
        self.engine_mut(id)?.reset();
        Ok(())
    }

    /// Stop and join every engine. The registry stays usable; timers can be
    /// started again.
    pub async fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.engine.shutdown().await;
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn slot(&self, id: TimerId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.config.id == Some(id))
    }

    fn index_of(&self, id: TimerId) -> Result<usize> {
        self.slots
            .iter()
            .position(|s| s.config.id == Some(id))
            .ok_or_else(|| CoreError::NotFound(format!("timer {id}")))
    }

    fn engine_mut(&mut self, id: TimerId) -> Result<&mut TimerEngine> {
        let index = self.index_of(id)?;
        Ok(&mut self.slots[index].engine)
    }

    fn duplicate(&self, name: &str) -> CoreError {
        CoreError::DuplicateName {
            name: name.to_string(),
            date: crate::clock::format_date(self.active_date),
        }
    }
}

fn build_slots(ctx: &EngineContext, options: EngineOptions, date: NaiveDate) -> Result<Vec<Slot>> {
    let configs = ctx.gateway.list_timer_configs(date)?;
    let mut slots = Vec::with_capacity(configs.len());
    for config in configs {
        let Some(id) = config.id else {
            warn!(name = %config.name, "stored timer has no id, skipping");
            continue;
        };
        let engine = TimerEngine::new(id, &config, options, ctx.clone())?;
        slots.push(Slot { config, engine });
    }
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::NullNotifier;
    use crate::storage::{Database, PersistenceGateway};
    use crate::timer::TimerPhase;
    use chrono::{Local, TimeZone};
    use std::sync::Arc;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn setup() -> (Arc<Database>, TimerRegistry) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let clock = Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
        ));
        let ctx = EngineContext {
            gateway: db.clone(),
            notifier: Arc::new(NullNotifier),
            clock,
        };
        let registry = TimerRegistry::load(ctx, EngineOptions::default()).unwrap();
        (db, registry)
    }

    fn durations(work: u64) -> PhaseDurations {
        PhaseDurations::from_secs(work, 5, 10).unwrap()
    }

    #[tokio::test]
    async fn create_persists_and_rejects_duplicates() {
        let (db, mut registry) = setup();
        assert_eq!(registry.active_date(), day(3));

        let id = registry.create_timer("focus", durations(60), 4).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(db.list_timer_configs(day(3)).unwrap()[0].id, Some(id));

        let err = registry.create_timer("focus", durations(30), 2).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn invalid_timer_is_not_persisted() {
        let (db, mut registry) = setup();
        assert!(registry.create_timer("focus", durations(60), 0).is_err());
        assert!(registry.create_timer("   ", durations(60), 4).is_err());
        assert!(registry.is_empty());
        assert!(db.list_timer_configs(day(3)).unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_name_on_another_day_is_fine() {
        let (_db, mut registry) = setup();
        registry.create_timer("focus", durations(60), 4).unwrap();
        registry.select_date(day(4)).await.unwrap();
        assert!(registry.is_empty());
        registry.create_timer("focus", durations(60), 4).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn select_date_stops_running_engines_and_reloads_idle() {
        let (_db, mut registry) = setup();
        let id = registry.create_timer("focus", durations(60), 4).unwrap();
        registry.start(id).unwrap();
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(registry.any_running());

        registry.select_date(day(2)).await.unwrap();
        assert!(registry.is_empty());

        registry.select_date(day(3)).await.unwrap();
        let engine = registry.get(id).unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.phase(), TimerPhase::Work);
        assert_eq!(engine.remaining(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn update_restarts_with_new_durations() {
        let (db, mut registry) = setup();
        let id = registry.create_timer("focus", durations(60), 4).unwrap();
        registry.start(id).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        registry.update_timer(id, durations(120), 2).unwrap();
        let engine = registry.get(id).unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.remaining(), Duration::from_secs(120));
        assert_eq!(registry.config(id).unwrap().long_break_interval, 2);

        let stored = db.list_timer_configs(day(3)).unwrap().remove(0);
        assert_eq!(stored.durations.work, Duration::from_secs(120));
        assert_eq!(stored.long_break_interval, 2);
        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn delete_stops_and_forgets() {
        let (db, mut registry) = setup();
        let id = registry.create_timer("focus", durations(60), 4).unwrap();
        registry.start(id).unwrap();
        registry.delete_timer(id).await.unwrap();

        assert!(registry.get(id).is_none());
        assert!(db.list_timer_configs(day(3)).unwrap().is_empty());
        assert!(matches!(
            registry.delete_timer(id).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(registry.start(id), Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn available_dates_include_today() {
        let (db, registry) = setup();
        assert_eq!(registry.list_available_dates().unwrap(), vec![day(3)]);

        let stored = TimerConfig::new("old", durations(60), 4, day(1));
        db.save_timer_config(&stored).unwrap();
        let later = TimerConfig::new("later", durations(60), 4, day(3));
        db.save_timer_config(&later).unwrap();
        assert_eq!(
            registry.list_available_dates().unwrap(),
            vec![day(3), day(1)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_stop_reset_by_id() {
        let (_db, mut registry) = setup();
        let id = registry.create_timer("focus", durations(60), 4).unwrap();
        assert!(registry.start(id).unwrap());
        assert!(!registry.start(id).unwrap());
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(registry.stop(id).unwrap());
        assert_eq!(registry.snapshots()[0].remaining_secs, 57);
        registry.reset(id).unwrap();
        assert_eq!(registry.snapshots()[0].remaining_secs, 60);
        registry.shutdown().await;
    }
}
