//! Session engine.
//!
//! Owns the chain, one [`SessionTimer`] per slot, the shared
//! [`SessionContext`] and the display pointer. It does not use internal
//! threads: the host delivers ticks through [`SessionEngine::on_tick`] for
//! every slot its [`TickSource`] has armed, and forwards user input to the
//! command methods. Every command takes `&mut self`, so all mutations are
//! serialized by construction.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::with_defaults(4)?;
//! engine.start("main");
//! // Once per second:
//! for event in engine.pump() { /* render */ }
//! ```
//!
//! Commands return the events they produced; an empty list means the
//! command was declined or had nothing to do.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::chain::{SessionChain, Slot, SlotDurations, SlotId};
use super::context::SessionContext;
use super::session::{SessionTimer, TickOutcome, TimerPhase};
use super::ticks::{ManualTicker, TickSource};
use crate::alert::{AlertSound, SilentAlert};
use crate::display::SlotView;
use crate::error::ConfigError;
use crate::events::Event;
use crate::storage::Config;

pub const DEFAULT_ALERT_RESOURCE: &str = "notification.wav";

#[derive(Debug)]
pub struct SessionEngine<T: TickSource = ManualTicker, A: AlertSound = SilentAlert> {
    chain: SessionChain,
    /// Index-aligned with `chain.slots()`.
    timers: Vec<SessionTimer>,
    ctx: SessionContext,
    current: usize,
    durations: SlotDurations,
    /// Persisted per-slot lengths, applied to every chain this engine builds.
    configured: HashMap<String, u64>,
    /// Lengths changed during this cycle; dropped when the chain is rebuilt.
    overrides: HashMap<String, u64>,
    alert_resource: String,
    alerts_enabled: bool,
    ticks: T,
    alert: A,
}

impl SessionEngine<ManualTicker, SilentAlert> {
    /// Engine with default durations, a host-driven ticker and no audio.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidCycleCount` if `cycle_count < 1`.
    pub fn with_defaults(cycle_count: u32) -> Result<Self, ConfigError> {
        Self::new(
            cycle_count,
            SlotDurations::default(),
            ManualTicker::new(),
            SilentAlert,
        )
    }
}

impl<T: TickSource, A: AlertSound> SessionEngine<T, A> {
    /// # Errors
    ///
    /// Returns a `ConfigError` if the chain cannot be built.
    pub fn new(
        cycle_count: u32,
        durations: SlotDurations,
        ticks: T,
        alert: A,
    ) -> Result<Self, ConfigError> {
        let chain = SessionChain::build(cycle_count, &durations)?;
        let timers = chain.slots().iter().map(SessionTimer::new).collect();
        Ok(Self {
            chain,
            timers,
            ctx: SessionContext::new(),
            current: 0,
            durations,
            configured: HashMap::new(),
            overrides: HashMap::new(),
            alert_resource: DEFAULT_ALERT_RESOURCE.to_string(),
            alerts_enabled: true,
            ticks,
            alert,
        })
    }

    /// Build an engine from persisted configuration, including per-slot
    /// overrides and alert settings. Configured overrides apply to every
    /// rebuilt chain as well.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a zero cycle count or zero duration.
    pub fn from_config(config: &Config, ticks: T, alert: A) -> Result<Self, ConfigError> {
        let durations = config.durations.to_slot_durations();
        let configured = config.overrides.clone();
        let chain =
            SessionChain::build_with_overrides(config.cycle_count, &durations, &configured)?;
        let timers = chain.slots().iter().map(SessionTimer::new).collect();
        Ok(Self {
            chain,
            timers,
            ctx: SessionContext::new(),
            current: 0,
            durations,
            configured,
            overrides: HashMap::new(),
            alert_resource: config.alert.sound.clone(),
            alerts_enabled: config.alert.enabled,
            ticks,
            alert,
        })
    }

    pub fn with_alert_resource(mut self, resource: impl Into<String>) -> Self {
        self.alert_resource = resource.into();
        self
    }

    pub fn with_alerts_enabled(mut self, enabled: bool) -> Self {
        self.alerts_enabled = enabled;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn chain(&self) -> &SessionChain {
        &self.chain
    }

    pub fn cycle_count(&self) -> u32 {
        self.chain.cycle_count()
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn timers(&self) -> &[SessionTimer] {
        &self.timers
    }

    pub fn timer(&self, id: &str) -> Option<&SessionTimer> {
        self.chain.index_of(id).map(|i| &self.timers[i])
    }

    pub fn phase(&self, id: &str) -> Option<TimerPhase> {
        self.timer(id).map(SessionTimer::phase)
    }

    pub fn remaining_seconds(&self, id: &str) -> Option<u64> {
        self.timer(id).map(SessionTimer::remaining_seconds)
    }

    pub fn current_slot(&self) -> &Slot {
        &self.chain.slots()[self.current]
    }

    pub fn current_slot_id(&self) -> &SlotId {
        &self.current_slot().id
    }

    /// Durations changed with [`Self::apply_duration_override`] since the
    /// last rebuild.
    pub fn overrides(&self) -> &HashMap<String, u64> {
        &self.overrides
    }

    pub fn durations(&self) -> &SlotDurations {
        &self.durations
    }

    pub fn ticks(&self) -> &T {
        &self.ticks
    }

    pub fn alert(&self) -> &A {
        &self.alert
    }

    pub fn alert_mut(&mut self) -> &mut A {
        &mut self.alert
    }

    pub fn view(&self, id: &str) -> Option<SlotView> {
        let i = self.chain.index_of(id)?;
        Some(self.view_at(i))
    }

    pub fn current_view(&self) -> SlotView {
        self.view_at(self.current)
    }

    pub fn views(&self) -> Vec<SlotView> {
        (0..self.timers.len()).map(|i| self.view_at(i)).collect()
    }

    fn view_at(&self, i: usize) -> SlotView {
        let slot = &self.chain.slots()[i];
        let timer = &self.timers[i];
        SlotView {
            slot_id: slot.id.clone(),
            display_name: slot.display_name.clone(),
            kind: slot.kind,
            phase: timer.phase(),
            remaining_secs: timer.remaining_seconds(),
            duration_secs: timer.duration_seconds(),
            is_muted: timer.is_muted(),
            is_current: i == self.current,
            completed: self.ctx.is_completed(&slot.id),
            startable: !timer.is_running() && self.start_allowed(i),
        }
    }

    /// Gating plus the single-running rule: a slot may not start while a
    /// different timer is counting down.
    fn start_allowed(&self, i: usize) -> bool {
        let timer = &self.timers[i];
        if !timer.may_start(&self.chain, &self.ctx) {
            return false;
        }
        match self.ctx.active() {
            Some(active) if active != timer.slot_id() => {
                !self.timer(active.as_str()).is_some_and(SessionTimer::is_running)
            }
            _ => true,
        }
    }

    // ── Timer commands ───────────────────────────────────────────────

    /// Start the slot's countdown if gating allows it.
    ///
    /// Pressing start on a slot that has expired but is still the active
    /// timer rewinds it with a soft reset instead of running it; a second
    /// press then starts the fresh countdown.
    pub fn start(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            debug!(slot = id, "start ignored: unknown slot");
            return Vec::new();
        };
        if self.timers[i].is_running() {
            return Vec::new();
        }
        if !self.start_allowed(i) {
            debug!(slot = id, "start declined");
            return Vec::new();
        }

        let slot = self.timers[i].slot_id().clone();
        if self.timers[i].phase().is_finished() {
            self.ctx.set_active(&slot);
            return self.soft_reset_at(i);
        }

        let timer = &mut self.timers[i];
        timer.begin(&mut self.ctx, &mut self.ticks);
        info!(slot = %slot, remaining = timer.remaining_seconds(), "timer started");
        vec![Event::TimerStarted {
            slot,
            remaining_secs: timer.remaining_seconds(),
            at: Utc::now(),
        }]
    }

    /// Pause a running countdown, keeping the remaining time.
    pub fn stop(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            return Vec::new();
        };
        let timer = &mut self.timers[i];
        if !timer.stop(&mut self.ctx, &mut self.ticks) {
            return Vec::new();
        }
        info!(slot = id, remaining = timer.remaining_seconds(), "timer stopped");
        vec![Event::TimerStopped {
            slot: timer.slot_id().clone(),
            remaining_secs: timer.remaining_seconds(),
            at: Utc::now(),
        }]
    }

    /// The play/pause button: stop if running, otherwise start.
    pub fn toggle(&mut self, id: &str) -> Vec<Event> {
        if self.timer(id).is_some_and(SessionTimer::is_running) {
            self.stop(id)
        } else {
            self.start(id)
        }
    }

    /// User-initiated (hard) reset. Releases the active claim and only checks
    /// for a finished cycle when a sounding alert was stopped.
    pub fn reset(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            return Vec::new();
        };
        let timer = &mut self.timers[i];
        let stopped_sound = timer.reset(&mut self.ticks, &mut self.alert);
        let slot = timer.slot_id().clone();
        if self.ctx.is_active(&slot) {
            self.ctx.clear_active();
        }
        info!(slot = %slot, "timer reset");

        let mut events = vec![Event::TimerReset {
            slot,
            hard: true,
            at: Utc::now(),
        }];
        if stopped_sound {
            self.complete_cycle_if_done(&mut events);
        }
        events
    }

    /// Acknowledge an expired slot: stop the alert, mute it, release the
    /// active claim and start a new cycle if every slot is done.
    pub fn silence_alert(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            return Vec::new();
        };
        let timer = &mut self.timers[i];
        if !timer.silence(&mut self.ctx, &mut self.alert) {
            return Vec::new();
        }
        info!(slot = id, "alert silenced");
        let mut events = vec![Event::AlertSilenced {
            slot: timer.slot_id().clone(),
            at: Utc::now(),
        }];
        self.complete_cycle_if_done(&mut events);
        events
    }

    /// Sound the alert for an expired slot. Audio failures are logged and the
    /// slot stays expired without sound.
    pub fn notify(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            return Vec::new();
        };
        let timer = &mut self.timers[i];
        match timer.notify(&mut self.alert, &self.alert_resource) {
            Ok(true) => vec![Event::AlertStarted {
                slot: timer.slot_id().clone(),
                at: Utc::now(),
            }],
            Ok(false) => Vec::new(),
            Err(e) => {
                warn!(slot = id, error = %e, "alert unavailable, timer expired silently");
                Vec::new()
            }
        }
    }

    /// Tick handler for the host scheduler. A tick for a slot with no armed
    /// handle means a cancelled interval leaked; it is logged and dropped.
    pub fn on_tick(&mut self, id: &str) -> Vec<Event> {
        let Some(i) = self.chain.index_of(id) else {
            error!(slot = id, "tick for a slot outside the current chain");
            return Vec::new();
        };
        if self.timers[i].tick_handle().is_none() {
            error!(slot = id, "tick delivered after cancellation");
            return Vec::new();
        }
        match self.timers[i].tick(&mut self.ctx, &mut self.ticks) {
            TickOutcome::Ignored | TickOutcome::Counted { .. } => Vec::new(),
            TickOutcome::Expired => self.expire_at(i),
        }
    }

    // ── Navigation ───────────────────────────────────────────────────

    /// Move the display to the next slot, wrapping after the long break.
    /// Never touches timer state.
    pub fn advance_forward(&mut self) -> Vec<Event> {
        let to = (self.current + 1) % self.chain.len();
        self.move_display(to)
    }

    /// Move the display to the previous slot. The entry slot has no
    /// predecessor, so this is a no-op there.
    pub fn advance_backward(&mut self) -> Vec<Event> {
        match self.current.checked_sub(1) {
            Some(to) => self.move_display(to),
            None => Vec::new(),
        }
    }

    fn move_display(&mut self, to: usize) -> Vec<Event> {
        let from = self.current_slot_id().clone();
        self.current = to;
        vec![Event::DisplayMoved {
            from,
            to: self.current_slot_id().clone(),
            at: Utc::now(),
        }]
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Change one slot's duration. The slot is hard-reset to the new length.
    /// The change lasts until the chain is rebuilt.
    ///
    /// # Errors
    ///
    /// `UnknownSlot` or `InvalidDuration`; nothing changes on error.
    pub fn apply_duration_override(
        &mut self,
        id: &str,
        seconds: u64,
    ) -> Result<Vec<Event>, ConfigError> {
        let i = self
            .chain
            .index_of(id)
            .ok_or_else(|| ConfigError::UnknownSlot(id.to_string()))?;
        self.chain.set_duration(id, seconds)?;
        self.timers[i].set_duration(seconds);
        self.overrides.insert(id.to_string(), seconds);
        info!(slot = id, seconds, "duration changed");

        let mut events = vec![Event::DurationChanged {
            slot: self.timers[i].slot_id().clone(),
            duration_secs: seconds,
            at: Utc::now(),
        }];
        events.extend(self.reset(id));
        Ok(events)
    }

    /// Rebuild the chain for a new cycle count. Every slot gets its default
    /// (or configured) length back.
    ///
    /// # Errors
    ///
    /// `InvalidCycleCount` if `cycle_count < 1`; the current chain is left
    /// untouched.
    pub fn set_cycle_count(&mut self, cycle_count: u32) -> Result<Vec<Event>, ConfigError> {
        let chain =
            SessionChain::build_with_overrides(cycle_count, &self.durations, &self.configured)?;
        Ok(vec![self.install(chain)])
    }

    /// Rebuild with the current cycle count, starting a fresh cycle.
    ///
    /// # Errors
    ///
    /// Only fails if the stored durations are invalid.
    pub fn rebuild(&mut self) -> Result<Vec<Event>, ConfigError> {
        self.set_cycle_count(self.chain.cycle_count())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn expire_at(&mut self, i: usize) -> Vec<Event> {
        let slot = self.timers[i].slot_id().clone();
        let next = (i + 1) % self.chain.len();
        self.current = next;
        let next_slot = self.current_slot_id().clone();
        info!(slot = %slot, next = %next_slot, "session expired");

        let mut events = vec![Event::TimerExpired {
            slot: slot.clone(),
            next_slot,
            at: Utc::now(),
        }];
        if self.alerts_enabled {
            events.extend(self.notify(slot.as_str()));
        }
        events
    }

    /// Internal reset: keeps the active claim, always silences and always
    /// checks whether the cycle is finished.
    fn soft_reset_at(&mut self, i: usize) -> Vec<Event> {
        let timer = &mut self.timers[i];
        timer.reset(&mut self.ticks, &mut self.alert);
        debug!(slot = %timer.slot_id(), "timer rewound");
        let mut events = vec![Event::TimerReset {
            slot: timer.slot_id().clone(),
            hard: false,
            at: Utc::now(),
        }];
        self.complete_cycle_if_done(&mut events);
        events
    }

    fn complete_cycle_if_done(&mut self, events: &mut Vec<Event>) {
        if !self.ctx.cycle_complete(self.chain.len()) {
            return;
        }
        info!(cycle_count = self.chain.cycle_count(), "cycle finished");
        match self.rebuild() {
            Ok(rebuilt) => events.extend(rebuilt),
            Err(e) => warn!(error = %e, "could not start a new cycle"),
        }
    }

    /// Swap in a freshly built chain. Old timers release their ticks and
    /// alerts first so nothing from the previous chain can fire afterwards.
    fn install(&mut self, chain: SessionChain) -> Event {
        for timer in &mut self.timers {
            timer.release(&mut self.ticks, &mut self.alert);
        }
        self.timers = chain.slots().iter().map(SessionTimer::new).collect();
        self.chain = chain;
        self.overrides.clear();
        self.ctx.clear();
        self.current = 0;
        info!(
            cycle_count = self.chain.cycle_count(),
            slots = self.chain.len(),
            "chain rebuilt"
        );
        Event::ChainRebuilt {
            cycle_count: self.chain.cycle_count(),
            slot_count: self.chain.len(),
            at: Utc::now(),
        }
    }
}

impl<A: AlertSound> SessionEngine<ManualTicker, A> {
    /// Deliver one tick to every armed slot.
    pub fn pump(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        for slot in self.ticks.armed_slots() {
            events.extend(self.on_tick(slot.as_str()));
        }
        events
    }
}
