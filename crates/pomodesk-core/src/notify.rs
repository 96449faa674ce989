//! Notification capability.
//!
//! The core never plays audio or touches a UI. It hands every [`Event`] to an
//! injected [`Notifier`]; delivery is fire-and-forget and a failing notifier
//! can never change engine or board state. [`dispatch`] is the only way the
//! core calls a notifier.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::clock::format_countdown;
use crate::events::Event;
use crate::timer::TimerPhase;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification channel closed")]
    ChannelClosed,

    #[error("notification device unavailable: {0}")]
    Device(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event) -> Result<(), NotifyError>;
}

/// Deliver `event`, logging and dropping any failure.
pub fn dispatch(notifier: &dyn Notifier, event: &Event) {
    if let Err(e) = notifier.notify(event) {
        warn!("dropped notification: {e}");
    }
}

/// Audible cue chosen by which phase just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    WorkComplete,
    BreakComplete,
    LongBreakComplete,
}

impl Cue {
    pub fn for_completed(from: TimerPhase) -> Self {
        match from {
            TimerPhase::Work => Cue::WorkComplete,
            TimerPhase::ShortBreak => Cue::BreakComplete,
            TimerPhase::LongBreak => Cue::LongBreakComplete,
        }
    }

    fn bell_count(self) -> usize {
        match self {
            Cue::WorkComplete => 1,
            Cue::BreakComplete => 2,
            Cue::LongBreakComplete => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Writes non-tick events to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &Event) -> Result<(), NotifyError> {
        match event {
            Event::TimerTicked { .. } => {}
            Event::PhaseCompleted {
                timer_name, from, to, ..
            } => info!(timer = %timer_name, %from, %to, "phase completed"),
            Event::TimerStarted {
                timer_name,
                phase,
                remaining_secs,
                ..
            }
            | Event::TimerStopped {
                timer_name,
                phase,
                remaining_secs,
                ..
            } => info!(
                timer = %timer_name,
                phase = phase.label(),
                remaining = %format_countdown(Duration::from_secs(*remaining_secs)),
                running = matches!(event, Event::TimerStarted { .. }),
                "timer toggled"
            ),
            other => debug!(?other, "event"),
        }
        Ok(())
    }
}

/// Forwards events to an unbounded channel; the observer side of the core.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &Event) -> Result<(), NotifyError> {
        self.tx
            .send(event.clone())
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Rings the terminal bell when a phase completes: once after work, twice
/// after a short break, three times after a long break.
#[derive(Debug)]
pub struct BellNotifier<W> {
    out: Mutex<W>,
    enabled: bool,
}

impl BellNotifier<std::io::Stderr> {
    pub fn stderr(enabled: bool) -> Self {
        Self::new(std::io::stderr(), enabled)
    }
}

impl<W: Write + Send> BellNotifier<W> {
    pub fn new(out: W, enabled: bool) -> Self {
        Self {
            out: Mutex::new(out),
            enabled,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Notifier for BellNotifier<W> {
    fn notify(&self, event: &Event) -> Result<(), NotifyError> {
        let Event::PhaseCompleted { from, .. } = event else {
            return Ok(());
        };
        if !self.enabled {
            return Ok(());
        }
        let bells = "\x07".repeat(Cue::for_completed(*from).bell_count());
        let mut out = self
            .out
            .lock()
            .map_err(|_| NotifyError::Device("bell writer poisoned".into()))?;
        out.write_all(bells.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| NotifyError::Device(e.to_string()))
    }
}

/// Sends every event to each inner notifier. One failing sink does not stop
/// delivery to the others; the first error is reported.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutNotifier")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, event: &Event) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
