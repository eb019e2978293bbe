mod chain;
mod context;
mod engine;
mod session;
mod ticks;

pub use chain::{
    SessionChain, Slot, SlotDurations, SlotId, SlotKind, DEFAULT_LONG_BREAK_SECS,
    DEFAULT_POMODORO_SECS, DEFAULT_SHORT_BREAK_SECS, ENTRY_SLOT_ID, LONG_BREAK_SLOT_ID,
};
pub use context::SessionContext;
pub use engine::{SessionEngine, DEFAULT_ALERT_RESOURCE};
pub use session::{SessionTimer, TickOutcome, TimerPhase};
pub use ticks::{ManualTicker, TickHandle, TickSource};
