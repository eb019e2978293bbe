//! Per-slot countdown state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --tick(0)--> Expired --notify--> AlertActive
//!  ^                 |                    |                    |
//!  +------stop-------+                    +------silence-------+
//!  +---------------------reset (any state)---------------------+
//! ```
//!
//! The timer owns only its own countdown. Chain-wide effects (advancing the
//! display, rebuilding after a full cycle) are the engine's job.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::chain::{SessionChain, Slot, SlotId};
use super::context::SessionContext;
use super::ticks::{TickHandle, TickSource};
use crate::alert::{AlertHandle, AlertSound};
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Idle,
    Running,
    /// Countdown finished; no alert is sounding.
    Expired,
    AlertActive,
}

impl TimerPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, TimerPhase::Expired | TimerPhase::AlertActive)
    }
}

/// Result of delivering one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Timer was not running; nothing changed.
    Ignored,
    Counted { remaining: u64 },
    /// This tick brought the countdown to zero.
    Expired,
}

#[derive(Debug, Clone)]
pub struct SessionTimer {
    slot_id: SlotId,
    duration_seconds: u64,
    remaining_seconds: u64,
    phase: TimerPhase,
    is_muted: bool,
    tick: Option<TickHandle>,
    alert: Option<AlertHandle>,
}

impl SessionTimer {
    pub fn new(slot: &Slot) -> Self {
        Self {
            slot_id: slot.id.clone(),
            duration_seconds: slot.duration_seconds,
            remaining_seconds: slot.duration_seconds,
            phase: TimerPhase::Idle,
            is_muted: false,
            tick: None,
            alert: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn slot_id(&self) -> &SlotId {
        &self.slot_id
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    pub fn tick_handle(&self) -> Option<TickHandle> {
        self.tick
    }

    /// 0.0 .. 1.0 progress through this slot.
    pub fn progress(&self) -> f64 {
        if self.duration_seconds == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_seconds as f64 / self.duration_seconds as f64)
    }

    /// Start gating. A slot may start when any of these hold:
    ///
    /// - it is the entry slot and the cycle is fresh (nothing completed) or
    ///   just finished (everything completed);
    /// - it is the active timer and has itself completed, i.e. the user is
    ///   pressing start again on a just-expired slot;
    /// - its predecessor has completed.
    pub fn may_start(&self, chain: &SessionChain, ctx: &SessionContext) -> bool {
        let id = &self.slot_id;
        let fresh_entry = chain.is_entry(id.as_str())
            && (ctx.registry_is_empty() || ctx.cycle_complete(chain.len()));
        let reentry = ctx.is_active(id) && ctx.is_completed(id);
        let after_predecessor = chain
            .predecessor(id.as_str())
            .is_some_and(|p| ctx.is_completed(&p.id));
        fresh_entry || reentry || after_predecessor
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Idle -> Running. Returns false if the timer was not idle.
    pub(crate) fn begin(&mut self, ctx: &mut SessionContext, ticks: &mut impl TickSource) -> bool {
        if self.phase != TimerPhase::Idle {
            return false;
        }
        if let Some(stale) = self.tick.take() {
            ticks.cancel(stale);
        }
        self.phase = TimerPhase::Running;
        self.is_muted = false;
        self.tick = Some(ticks.schedule(&self.slot_id));
        ctx.set_active(&self.slot_id);
        true
    }

    /// Running -> Idle, keeping the remaining time.
    pub(crate) fn stop(&mut self, ctx: &mut SessionContext, ticks: &mut impl TickSource) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.cancel_tick(ticks);
        self.phase = TimerPhase::Idle;
        if ctx.is_active(&self.slot_id) {
            ctx.clear_active();
        }
        true
    }

    /// Count down one second. Reaching zero cancels the tick, enters
    /// `Expired` and marks the slot completed. Active ownership is kept
    /// until the alert is acknowledged.
    pub(crate) fn tick(
        &mut self,
        ctx: &mut SessionContext,
        ticks: &mut impl TickSource,
    ) -> TickOutcome {
        if self.phase != TimerPhase::Running {
            return TickOutcome::Ignored;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Counted {
                remaining: self.remaining_seconds,
            };
        }
        self.cancel_tick(ticks);
        self.phase = TimerPhase::Expired;
        ctx.mark_completed(&self.slot_id);
        TickOutcome::Expired
    }

    /// Expired -> AlertActive. On failure the timer stays `Expired`.
    pub(crate) fn notify(
        &mut self,
        alert: &mut impl AlertSound,
        resource: &str,
    ) -> Result<bool, AudioError> {
        if self.phase != TimerPhase::Expired {
            return Ok(false);
        }
        let handle = alert.play(resource)?;
        self.alert = Some(handle);
        self.phase = TimerPhase::AlertActive;
        Ok(true)
    }

    /// Acknowledge an expiry: stop any sound, mute, release the active slot
    /// and rewind to `Idle`. Returns false if the timer had not expired.
    pub(crate) fn silence(
        &mut self,
        ctx: &mut SessionContext,
        alert: &mut impl AlertSound,
    ) -> bool {
        if !self.phase.is_finished() {
            return false;
        }
        self.stop_alert(alert);
        self.is_muted = true;
        self.rewind();
        if ctx.is_active(&self.slot_id) {
            ctx.clear_active();
        }
        true
    }

    /// Return to `Idle` with the full duration from any phase. Returns
    /// whether a sounding alert was stopped. Active ownership is left to the
    /// caller, which distinguishes hard from soft resets.
    pub(crate) fn reset(
        &mut self,
        ticks: &mut impl TickSource,
        alert: &mut impl AlertSound,
    ) -> bool {
        self.cancel_tick(ticks);
        let was_finished = self.phase.is_finished();
        let stopped_sound = self.stop_alert(alert);
        if stopped_sound || was_finished {
            self.is_muted = true;
        }
        self.rewind();
        stopped_sound
    }

    /// Release every external resource before this timer is discarded.
    pub(crate) fn release(&mut self, ticks: &mut impl TickSource, alert: &mut impl AlertSound) {
        self.cancel_tick(ticks);
        self.stop_alert(alert);
    }

    pub(crate) fn set_duration(&mut self, seconds: u64) {
        self.duration_seconds = seconds;
        self.remaining_seconds = self.remaining_seconds.min(seconds);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rewind(&mut self) {
        self.phase = TimerPhase::Idle;
        self.remaining_seconds = self.duration_seconds;
    }

    fn cancel_tick(&mut self, ticks: &mut impl TickSource) {
        if let Some(handle) = self.tick.take() {
            ticks.cancel(handle);
        }
    }

    fn stop_alert(&mut self, alert: &mut impl AlertSound) -> bool {
        let Some(handle) = self.alert.take() else {
            return false;
        };
        if let Err(e) = alert.stop(handle) {
            warn!(slot = %self.slot_id, error = %e, "failed to stop alert");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::SilentAlert;
    use crate::timer::chain::SlotDurations;
    use crate::timer::ticks::ManualTicker;

    fn chain() -> SessionChain {
        let durations = SlotDurations {
            pomodoro: 3,
            short_break: 2,
            long_break: 4,
        };
        SessionChain::build(2, &durations).unwrap()
    }

    fn timer_for(chain: &SessionChain, id: &str) -> SessionTimer {
        SessionTimer::new(chain.get(id).unwrap())
    }

    #[test]
    fn entry_may_start_on_fresh_cycle() {
        let chain = chain();
        let ctx = SessionContext::new();
        assert!(timer_for(&chain, "main").may_start(&chain, &ctx));
        assert!(!timer_for(&chain, "break_1").may_start(&chain, &ctx));
    }

    #[test]
    fn entry_blocked_mid_cycle() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        ctx.mark_completed(&"main".into());
        assert!(!timer_for(&chain, "main").may_start(&chain, &ctx));
        assert!(timer_for(&chain, "break_1").may_start(&chain, &ctx));
    }

    #[test]
    fn entry_may_start_at_cycle_boundary() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        for slot in chain.slots() {
            ctx.mark_completed(&slot.id);
        }
        assert!(timer_for(&chain, "main").may_start(&chain, &ctx));
    }

    #[test]
    fn active_completed_slot_may_restart() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        let break_1 = timer_for(&chain, "break_1");
        ctx.mark_completed(break_1.slot_id());
        assert!(!timer_for(&chain, "break_1").may_start(&chain, &ctx));
        ctx.set_active(break_1.slot_id());
        assert!(break_1.may_start(&chain, &ctx));
    }

    #[test]
    fn tick_counts_down_and_expires_once() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        let mut ticks = ManualTicker::new();
        let mut timer = timer_for(&chain, "main");

        assert!(timer.begin(&mut ctx, &mut ticks));
        assert_eq!(ticks.armed_count(), 1);
        assert_eq!(timer.tick(&mut ctx, &mut ticks), TickOutcome::Counted { remaining: 2 });
        assert_eq!(timer.tick(&mut ctx, &mut ticks), TickOutcome::Counted { remaining: 1 });
        assert_eq!(timer.tick(&mut ctx, &mut ticks), TickOutcome::Expired);
        assert_eq!(timer.phase(), TimerPhase::Expired);
        assert_eq!(ticks.armed_count(), 0);
        assert!(ctx.is_completed(timer.slot_id()));
        assert!(ctx.is_active(timer.slot_id()));

        assert_eq!(timer.tick(&mut ctx, &mut ticks), TickOutcome::Ignored);
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[test]
    fn stop_keeps_remaining_and_clears_active() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        let mut ticks = ManualTicker::new();
        let mut timer = timer_for(&chain, "main");

        timer.begin(&mut ctx, &mut ticks);
        timer.tick(&mut ctx, &mut ticks);
        assert!(timer.stop(&mut ctx, &mut ticks));
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_seconds(), 2);
        assert!(ctx.active().is_none());
        assert_eq!(ticks.armed_count(), 0);
        assert!(!timer.stop(&mut ctx, &mut ticks));
    }

    #[test]
    fn notify_without_audio_stays_expired() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        let mut ticks = ManualTicker::new();
        let mut timer = timer_for(&chain, "break_1");
        timer.begin(&mut ctx, &mut ticks);
        timer.tick(&mut ctx, &mut ticks);
        timer.tick(&mut ctx, &mut ticks);

        assert!(timer.notify(&mut SilentAlert, "ding").is_err());
        assert_eq!(timer.phase(), TimerPhase::Expired);
    }

    #[test]
    fn reset_from_running_restores_duration() {
        let chain = chain();
        let mut ctx = SessionContext::new();
        let mut ticks = ManualTicker::new();
        let mut timer = timer_for(&chain, "main");
        timer.begin(&mut ctx, &mut ticks);
        timer.tick(&mut ctx, &mut ticks);

        assert!(!timer.reset(&mut ticks, &mut SilentAlert));
        assert_eq!(timer.phase(), TimerPhase::Idle);
        assert_eq!(timer.remaining_seconds(), timer.duration_seconds());
        assert_eq!(ticks.armed_count(), 0);
    }

    #[test]
    fn set_duration_clamps_remaining() {
        let chain = chain();
        let mut timer = timer_for(&chain, "long_break");
        timer.set_duration(1);
        assert_eq!(timer.remaining_seconds(), 1);
        assert_eq!(timer.duration_seconds(), 1);
    }
}
