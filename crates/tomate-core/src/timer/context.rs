//! Shared sequencing bookkeeping: which slots have completed this cycle and
//! which timer currently holds the right to run.
//!
//! Owned by the engine and lent to timers; mutated only through `&mut`, so a
//! single writer is guaranteed without locking.

use std::collections::BTreeSet;

use super::chain::SlotId;

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    completed: BTreeSet<SlotId>,
    active: Option<SlotId>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Completion registry ──────────────────────────────────────────

    pub fn is_completed(&self, id: &SlotId) -> bool {
        self.completed.contains(id)
    }

    pub fn mark_completed(&mut self, id: &SlotId) {
        self.completed.insert(id.clone());
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn completed(&self) -> impl Iterator<Item = &SlotId> {
        self.completed.iter()
    }

    pub fn registry_is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// True once every one of `slot_count` slots has expired this cycle.
    pub fn cycle_complete(&self, slot_count: usize) -> bool {
        slot_count > 0 && self.completed.len() >= slot_count
    }

    pub fn clear_registry(&mut self) {
        self.completed.clear();
    }

    // ── Active timer ─────────────────────────────────────────────────

    pub fn active(&self) -> Option<&SlotId> {
        self.active.as_ref()
    }

    pub fn is_active(&self, id: &SlotId) -> bool {
        self.active.as_ref() == Some(id)
    }

    pub fn set_active(&mut self, id: &SlotId) {
        self.active = Some(id.clone());
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Drop all bookkeeping; used when the chain is rebuilt.
    pub fn clear(&mut self) {
        self.completed.clear();
        self.active = None;
    }
}
