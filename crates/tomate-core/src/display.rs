//! Read-only view models for the display layer.

use serde::{Deserialize, Serialize};

use crate::timer::{SlotId, SlotKind, TimerPhase};

pub const TIMES_UP_LABEL: &str = "Time's up!";

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Everything a screen needs to render one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot_id: SlotId,
    pub display_name: String,
    pub kind: SlotKind,
    pub phase: TimerPhase,
    pub remaining_secs: u64,
    pub duration_secs: u64,
    pub is_muted: bool,
    pub is_current: bool,
    pub completed: bool,
    /// Whether a start press would currently be accepted.
    pub startable: bool,
}

impl SlotView {
    /// The big label under the slot name.
    pub fn clock_label(&self) -> String {
        if self.phase.is_finished() {
            TIMES_UP_LABEL.to_string()
        } else {
            format_clock(self.remaining_secs)
        }
    }

    /// Single status line used by terminal hosts.
    pub fn status_line(&self) -> String {
        let state = match self.phase {
            TimerPhase::Idle if self.is_muted => "idle, muted",
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Expired => "expired",
            TimerPhase::AlertActive => "ALERT",
        };
        format!(
            "[{}] {} {} ({state})",
            self.slot_id,
            self.display_name,
            self.clock_label()
        )
    }
}
