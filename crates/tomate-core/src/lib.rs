//! # Don Tomate Core Library
//!
//! Session sequencing and timer engine for the Don Tomate Pomodoro timer.
//! The terminal host and any GUI are thin layers over the same engine.
//!
//! ## Architecture
//!
//! - **Session chain**: an ordered ring of slots (Pomodoro, Short Break, ...,
//!   Long Break) built from a cycle count
//! - **Session timers**: one countdown state machine per slot, gated so that
//!   only one timer runs and progression stays linear
//! - **Engine**: owns the chain, the timers, the shared completion bookkeeping
//!   and the display pointer; the host delivers ticks and user commands
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: command surface used by the display layer
//! - [`SessionChain`]: slot construction and neighbour lookup
//! - [`SessionTimer`]: per-slot state machine
//! - [`Config`]: application configuration management

pub mod alert;
pub mod display;
pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use alert::{AlertHandle, AlertSound, SilentAlert};
pub use display::{format_clock, SlotView};
pub use error::{AudioError, ConfigError, CoreError};
pub use events::Event;
pub use storage::Config;
pub use timer::{
    ManualTicker, SessionChain, SessionContext, SessionEngine, SessionTimer, Slot, SlotDurations,
    SlotId, SlotKind, TickHandle, TickSource, TimerPhase,
};
