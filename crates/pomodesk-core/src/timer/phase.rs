//! Phases of a focus timer and the durations attached to them.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Work,
    ShortBreak,
    LongBreak,
}

impl TimerPhase {
    pub fn is_break(self) -> bool {
        !matches!(self, TimerPhase::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerPhase::Work => "Work",
            TimerPhase::ShortBreak => "Short Break",
            TimerPhase::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerPhase::Work => "work",
            TimerPhase::ShortBreak => "short_break",
            TimerPhase::LongBreak => "long_break",
        };
        f.write_str(s)
    }
}

/// Length of each phase, whole seconds only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    #[serde(with = "secs")]
    pub work: Duration,
    #[serde(with = "secs")]
    pub short_break: Duration,
    #[serde(with = "secs")]
    pub long_break: Duration,
}

impl PhaseDurations {
    /// Build and validate durations.
    ///
    /// # Errors
    /// `InvalidConfiguration` if any duration is zero or not a whole number
    /// of seconds.
    pub fn new(work: Duration, short_break: Duration, long_break: Duration) -> Result<Self> {
        let durations = Self {
            work,
            short_break,
            long_break,
        };
        durations.validate()?;
        Ok(durations)
    }

    pub fn from_secs(work: u64, short_break: u64, long_break: u64) -> Result<Self> {
        Self::new(
            Duration::from_secs(work),
            Duration::from_secs(short_break),
            Duration::from_secs(long_break),
        )
    }

    pub fn from_minutes(work: u64, short_break: u64, long_break: u64) -> Result<Self> {
        Self::from_secs(
            minutes_to_secs(TimerPhase::Work, work)?,
            minutes_to_secs(TimerPhase::ShortBreak, short_break)?,
            minutes_to_secs(TimerPhase::LongBreak, long_break)?,
        )
    }

    pub fn get(&self, phase: TimerPhase) -> Duration {
        match phase {
            TimerPhase::Work => self.work,
            TimerPhase::ShortBreak => self.short_break,
            TimerPhase::LongBreak => self.long_break,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for phase in [TimerPhase::Work, TimerPhase::ShortBreak, TimerPhase::LongBreak] {
            let d = self.get(phase);
            if d.is_zero() {
                return Err(CoreError::InvalidConfiguration(format!(
                    "{phase} duration must be positive"
                )));
            }
            if d.subsec_nanos() != 0 {
                return Err(CoreError::InvalidConfiguration(format!(
                    "{phase} duration must be a whole number of seconds, got {d:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Minutes to whole seconds, rejecting values that do not fit in `u64`.
pub fn minutes_to_secs(phase: TimerPhase, minutes: u64) -> Result<u64> {
    minutes.checked_mul(60).ok_or_else(|| {
        CoreError::InvalidConfiguration(format!(
            "{phase} duration of {minutes} minutes is too long"
        ))
    })
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            work: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
