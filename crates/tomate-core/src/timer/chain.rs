//! Session chain: the ordered ring of slots a cycle walks through.
//!
//! ```text
//! main -> break_1 -> main_2 -> break_2 -> ... -> main_N -> long_break -> main
//! ```
//!
//! Links are stored as ids and resolved by index arithmetic modulo the slot
//! count; the chain never holds references to its own slots.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Id of the entry slot ("Pomodoro 1").
pub const ENTRY_SLOT_ID: &str = "main";
/// Id of the closing slot ("Long Break").
pub const LONG_BREAK_SLOT_ID: &str = "long_break";

pub const DEFAULT_POMODORO_SECS: u64 = 25 * 60;
pub const DEFAULT_SHORT_BREAK_SECS: u64 = 5 * 60;
pub const DEFAULT_LONG_BREAK_SECS: u64 = 15 * 60;

/// Stable key of a slot within a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SlotId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SlotId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Pomodoro,
    ShortBreak,
    LongBreak,
}

impl SlotKind {
    pub fn is_break(self) -> bool {
        !matches!(self, SlotKind::Pomodoro)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub display_name: String,
    pub kind: SlotKind,
    pub duration_seconds: u64,
    /// `None` only for the entry slot.
    pub predecessor_id: Option<SlotId>,
    pub successor_id: SlotId,
}

/// Default durations per slot kind, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDurations {
    pub pomodoro: u64,
    pub short_break: u64,
    pub long_break: u64,
}

impl SlotDurations {
    pub fn for_kind(&self, kind: SlotKind) -> u64 {
        match kind {
            SlotKind::Pomodoro => self.pomodoro,
            SlotKind::ShortBreak => self.short_break,
            SlotKind::LongBreak => self.long_break,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, seconds) in [
            ("pomodoro", self.pomodoro),
            ("short_break", self.short_break),
            ("long_break", self.long_break),
        ] {
            if seconds == 0 {
                return Err(ConfigError::InvalidDuration {
                    slot: name.to_string(),
                    seconds,
                });
            }
        }
        Ok(())
    }
}

impl Default for SlotDurations {
    fn default() -> Self {
        Self {
            pomodoro: DEFAULT_POMODORO_SECS,
            short_break: DEFAULT_SHORT_BREAK_SECS,
            long_break: DEFAULT_LONG_BREAK_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredChain")]
pub struct SessionChain {
    cycle_count: u32,
    slots: Vec<Slot>,
}

/// Serialized form of a chain. Deserializing goes back through
/// [`SessionChain::build`], so only the per-slot lengths are taken from the
/// input and the ring links are always regenerated.
#[derive(Deserialize)]
struct StoredChain {
    cycle_count: u32,
    slots: Vec<Slot>,
}

impl TryFrom<StoredChain> for SessionChain {
    type Error = ConfigError;

    fn try_from(stored: StoredChain) -> Result<Self, Self::Error> {
        let mut chain = Self::build(stored.cycle_count, &SlotDurations::default())?;
        if stored.slots.len() != chain.len() {
            return Err(ConfigError::ParseFailed(format!(
                "{} slots stored for {} cycles",
                stored.slots.len(),
                stored.cycle_count
            )));
        }
        for slot in &stored.slots {
            chain.set_duration(slot.id.as_str(), slot.duration_seconds)?;
        }
        Ok(chain)
    }
}

impl SessionChain {
    /// Build the chain for `cycle_count` pomodoros with the given defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidCycleCount` when `cycle_count < 1` and
    /// `ConfigError::InvalidDuration` when any default is zero.
    pub fn build(cycle_count: u32, durations: &SlotDurations) -> Result<Self, ConfigError> {
        if cycle_count < 1 {
            return Err(ConfigError::InvalidCycleCount(cycle_count));
        }
        durations.validate()?;

        let mut layout: Vec<(SlotId, String, SlotKind)> =
            Vec::with_capacity(2 * cycle_count as usize);
        layout.push((ENTRY_SLOT_ID.into(), "Pomodoro 1".into(), SlotKind::Pomodoro));
        for i in 1..cycle_count {
            layout.push((
                SlotId::new(format!("break_{i}")),
                format!("Short Break {i}"),
                SlotKind::ShortBreak,
            ));
            layout.push((
                SlotId::new(format!("main_{}", i + 1)),
                format!("Pomodoro {}", i + 1),
                SlotKind::Pomodoro,
            ));
        }
        layout.push((LONG_BREAK_SLOT_ID.into(), "Long Break".into(), SlotKind::LongBreak));

        let n = layout.len();
        let slots = layout
            .iter()
            .enumerate()
            .map(|(i, (id, name, kind))| Slot {
                id: id.clone(),
                display_name: name.clone(),
                kind: *kind,
                duration_seconds: durations.for_kind(*kind),
                predecessor_id: (i > 0).then(|| layout[i - 1].0.clone()),
                successor_id: layout[(i + 1) % n].0.clone(),
            })
            .collect();

        Ok(Self { cycle_count, slots })
    }

    /// Build and then apply per-slot overrides (seconds). Overrides naming a
    /// slot that does not exist in this chain are skipped.
    ///
    /// # Errors
    ///
    /// Same as [`SessionChain::build`], plus `InvalidDuration` for a zero
    /// override on an existing slot.
    pub fn build_with_overrides(
        cycle_count: u32,
        durations: &SlotDurations,
        overrides: &HashMap<String, u64>,
    ) -> Result<Self, ConfigError> {
        let mut chain = Self::build(cycle_count, durations)?;
        for (id, &seconds) in overrides {
            if chain.index_of(id.as_str()).is_some() {
                chain.set_duration(id.as_str(), seconds)?;
            }
        }
        Ok(chain)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn entry(&self) -> &Slot {
        &self.slots[0]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn at(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn is_entry(&self, id: &str) -> bool {
        self.entry().id == id
    }

    pub fn successor(&self, id: &str) -> Option<&Slot> {
        let i = self.index_of(id)?;
        self.slots.get((i + 1) % self.slots.len())
    }

    /// The entry slot has no predecessor.
    pub fn predecessor(&self, id: &str) -> Option<&Slot> {
        let i = self.index_of(id)?;
        i.checked_sub(1).and_then(|p| self.slots.get(p))
    }

    pub fn total_duration_seconds(&self) -> u64 {
        self.slots.iter().map(|s| s.duration_seconds).sum()
    }

    pub fn pomodoro_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.kind == SlotKind::Pomodoro)
            .count()
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// `UnknownSlot` if `id` is not in the chain, `InvalidDuration` if
    /// `seconds` is zero.
    pub fn set_duration(&mut self, id: &str, seconds: u64) -> Result<(), ConfigError> {
        if seconds == 0 {
            return Err(ConfigError::InvalidDuration {
                slot: id.to_string(),
                seconds,
            });
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ConfigError::UnknownSlot(id.to_string()))?;
        slot.duration_seconds = seconds;
        Ok(())
    }
}
