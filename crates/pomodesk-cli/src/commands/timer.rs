//! Timer commands for CLI.
//!
//! Timers are addressed by name within a day (`--date`, default today).
//! Durations are given in minutes; omitted values come from `[pomodoro]`
//! in the config file.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::Subcommand;
use pomodesk_core::{
    minutes_to_secs, BellNotifier, ChannelNotifier, CoreError, EngineContext, Event, FanoutNotifier,
    LogNotifier, Notifier, NullNotifier, PhaseDurations, TimerId, TimerPhase, TimerRegistry,
};
use tracing::info;

use super::{date_arg, print_json, CmdResult, Workspace};

#[derive(Subcommand)]
pub enum TimerAction {
    /// List a day's timers
    List {
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Create a named timer
    Add {
        name: String,
        /// Work phase in minutes
        #[arg(long)]
        work: Option<u64>,
        /// Short break in minutes
        #[arg(long)]
        short_break: Option<u64>,
        /// Long break in minutes
        #[arg(long)]
        long_break: Option<u64>,
        /// Work phases before a long break
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Change a timer's durations or interval; omitted values are kept
    Update {
        name: String,
        #[arg(long)]
        work: Option<u64>,
        #[arg(long)]
        short_break: Option<u64>,
        #[arg(long)]
        long_break: Option<u64>,
        #[arg(long)]
        interval: Option<u32>,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Delete a timer
    Remove {
        name: String,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
    /// Run timers in the foreground, printing events as JSON lines until
    /// Ctrl-C or until every timer has stopped
    Run {
        /// Timers to start (default: all of the day)
        names: Vec<String>,
        /// Also print one line per second per timer
        #[arg(long)]
        ticks: bool,
        #[arg(long, value_parser = date_arg)]
        date: Option<NaiveDate>,
    },
}

async fn open_registry(
    ws: &Workspace,
    notifier: Arc<dyn Notifier>,
    date: Option<NaiveDate>,
) -> Result<TimerRegistry, Box<dyn std::error::Error>> {
    let ctx = EngineContext {
        gateway: ws.db.clone(),
        notifier,
        clock: ws.clock.clone(),
    };
    let mut registry = TimerRegistry::load(ctx, ws.config.engine_options())?;
    if let Some(date) = date {
        registry.select_date(date).await?;
    }
    Ok(registry)
}

fn lookup(registry: &TimerRegistry, name: &str) -> Result<TimerId, Box<dyn std::error::Error>> {
    registry
        .find_by_name(name)
        .ok_or_else(|| format!("no timer named '{name}' on {}", registry.active_date()).into())
}

fn minutes_or(
    phase: TimerPhase,
    value: Option<u64>,
    fallback_secs: u64,
) -> Result<u64, CoreError> {
    value.map_or(Ok(fallback_secs), |m| minutes_to_secs(phase, m))
}

pub async fn run(action: TimerAction) -> CmdResult {
    let ws = Workspace::open()?;

    match action {
        TimerAction::List { date } => {
            let registry = open_registry(&ws, Arc::new(NullNotifier), date).await?;
            let configs: Vec<_> = registry.configs().collect();
            print_json(&configs)?;
        }
        TimerAction::Add {
            name,
            work,
            short_break,
            long_break,
            interval,
            date,
        } => {
            let defaults = ws.config.default_durations()?;
            let durations = PhaseDurations::from_secs(
                minutes_or(TimerPhase::Work, work, defaults.work.as_secs())?,
                minutes_or(
                    TimerPhase::ShortBreak,
                    short_break,
                    defaults.short_break.as_secs(),
                )?,
                minutes_or(TimerPhase::LongBreak, long_break, defaults.long_break.as_secs())?,
            )?;
            let interval = interval.unwrap_or(ws.config.pomodoro.long_break_after);

            let mut registry = open_registry(&ws, Arc::new(LogNotifier), date).await?;
            let id = registry.create_timer(&name, durations, interval)?;
            print_json(&registry.config(id))?;
        }
        TimerAction::Update {
            name,
            work,
            short_break,
            long_break,
            interval,
            date,
        } => {
            let mut registry = open_registry(&ws, Arc::new(LogNotifier), date).await?;
            let id = lookup(&registry, &name)?;
            let current = registry
                .config(id)
                .cloned()
                .ok_or_else(|| format!("no timer named '{name}'"))?;
            let durations = PhaseDurations::from_secs(
                minutes_or(TimerPhase::Work, work, current.durations.work.as_secs())?,
                minutes_or(
                    TimerPhase::ShortBreak,
                    short_break,
                    current.durations.short_break.as_secs(),
                )?,
                minutes_or(
                    TimerPhase::LongBreak,
                    long_break,
                    current.durations.long_break.as_secs(),
                )?,
            )?;
            let interval = interval.unwrap_or(current.long_break_interval);
            registry.update_timer(id, durations, interval)?;
            print_json(&registry.config(id))?;
        }
        TimerAction::Remove { name, date } => {
            let mut registry = open_registry(&ws, Arc::new(LogNotifier), date).await?;
            let id = lookup(&registry, &name)?;
            registry.delete_timer(id).await?;
            println!("Timer removed: {name}");
        }
        TimerAction::Run { names, ticks, date } => {
            run_foreground(&ws, names, ticks, date).await?;
        }
    }
    Ok(())
}

async fn run_foreground(
    ws: &Workspace,
    names: Vec<String>,
    ticks: bool,
    date: Option<NaiveDate>,
) -> CmdResult {
    let (channel, mut events) = ChannelNotifier::new();
    let notifier = FanoutNotifier::new()
        .with(Arc::new(channel))
        .with(Arc::new(LogNotifier))
        .with(Arc::new(BellNotifier::stderr(
            ws.config.notifications.bell_enabled(),
        )));
    let mut registry = open_registry(ws, Arc::new(notifier), date).await?;

    let ids = if names.is_empty() {
        registry.snapshots().iter().map(|s| s.id).collect()
    } else {
        names
            .iter()
            .map(|name| lookup(&registry, name))
            .collect::<Result<Vec<_>, _>>()?
    };
    if ids.is_empty() {
        return Err(format!("no timers on {}", registry.active_date()).into());
    }
    for id in &ids {
        registry.start(*id)?;
    }
    info!(timers = ids.len(), date = %registry.active_date(), "running");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if ticks || !event.is_tick() {
                    println!("{}", serde_json::to_string(&event)?);
                }
                if matches!(event, Event::PhaseCompleted { .. } | Event::TimerStopped { .. })
                    && !registry.any_running()
                {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl-C, stopping timers");
                break;
            }
        }
    }

    registry.shutdown().await;
    // Stop events produced by the shutdown itself.
    while let Ok(event) = events.try_recv() {
        if !event.is_tick() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    Ok(())
}
