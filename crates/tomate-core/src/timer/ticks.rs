//! Tick scheduling seam.
//!
//! The engine never spawns threads. It asks a [`TickSource`] for a handle when
//! a timer starts running and cancels that handle synchronously when the timer
//! stops, expires or resets. The host delivers ticks by calling
//! `SessionEngine::on_tick` once per period for every armed slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::chain::SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TickHandle(pub u64);

pub trait TickSource {
    /// Register a one-second interval for `slot`.
    fn schedule(&mut self, slot: &SlotId) -> TickHandle;

    /// Unregister `handle`. After this returns no tick may be delivered for it.
    fn cancel(&mut self, handle: TickHandle);
}

/// Tick source driven by the host: it records which slots are armed and the
/// host polls [`ManualTicker::armed_slots`] from its own clock.
#[derive(Debug, Default)]
pub struct ManualTicker {
    next: u64,
    armed: BTreeMap<TickHandle, SlotId>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed_slots(&self) -> Vec<SlotId> {
        self.armed.values().cloned().collect()
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn is_armed(&self, slot: &SlotId) -> bool {
        self.armed.values().any(|s| s == slot)
    }
}

impl TickSource for ManualTicker {
    fn schedule(&mut self, slot: &SlotId) -> TickHandle {
        self.next += 1;
        let handle = TickHandle(self.next);
        self.armed.insert(handle, slot.clone());
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        self.armed.remove(&handle);
    }
}
