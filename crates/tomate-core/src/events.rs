use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::SlotId;

/// Every state change in the engine produces an Event.
/// The host renders them; an empty list from a command means it was declined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        slot: SlotId,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        slot: SlotId,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero; the display moved on to `next_slot`.
    TimerExpired {
        slot: SlotId,
        next_slot: SlotId,
        at: DateTime<Utc>,
    },
    AlertStarted {
        slot: SlotId,
        at: DateTime<Utc>,
    },
    AlertSilenced {
        slot: SlotId,
        at: DateTime<Utc>,
    },
    /// `hard` is true for a user-initiated reset.
    TimerReset {
        slot: SlotId,
        hard: bool,
        at: DateTime<Utc>,
    },
    DisplayMoved {
        from: SlotId,
        to: SlotId,
        at: DateTime<Utc>,
    },
    DurationChanged {
        slot: SlotId,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// The whole chain was replaced; all timers are fresh and idle.
    ChainRebuilt {
        cycle_count: u32,
        slot_count: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn slot(&self) -> Option<&SlotId> {
        match self {
            Event::TimerStarted { slot, .. }
            | Event::TimerStopped { slot, .. }
            | Event::TimerExpired { slot, .. }
            | Event::AlertStarted { slot, .. }
            | Event::AlertSilenced { slot, .. }
            | Event::TimerReset { slot, .. }
            | Event::DurationChanged { slot, .. } => Some(slot),
            Event::DisplayMoved { to, .. } => Some(to),
            Event::ChainRebuilt { .. } => None,
        }
    }

    /// One-line human summary for terminal output.
    pub fn describe(&self) -> String {
        match self {
            Event::TimerStarted { slot, remaining_secs, .. } => {
                format!("{slot} started ({})", crate::display::format_clock(*remaining_secs))
            }
            Event::TimerStopped { slot, remaining_secs, .. } => {
                format!("{slot} stopped at {}", crate::display::format_clock(*remaining_secs))
            }
            Event::TimerExpired { slot, next_slot, .. } => {
                format!("{slot}: time's up! next is {next_slot}")
            }
            Event::AlertStarted { slot, .. } => format!("{slot}: alert sounding"),
            Event::AlertSilenced { slot, .. } => format!("{slot}: alert silenced"),
            Event::TimerReset { slot, hard, .. } => {
                if *hard {
                    format!("{slot} reset")
                } else {
                    format!("{slot} rewound")
                }
            }
            Event::DisplayMoved { to, .. } => format!("showing {to}"),
            Event::DurationChanged { slot, duration_secs, .. } => {
                format!("{slot} set to {}", crate::display::format_clock(*duration_secs))
            }
            Event::ChainRebuilt { cycle_count, slot_count, .. } => {
                format!("new cycle: {cycle_count} pomodoros, {slot_count} slots")
            }
        }
    }
}
