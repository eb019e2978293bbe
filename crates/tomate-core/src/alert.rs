//! Audio capability seam for the expiry alert.
//!
//! Both calls are requests to an external backend and may fail; a failure
//! never blocks the timer, which simply stays expired without sound.

use serde::{Deserialize, Serialize};

use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertHandle(pub u64);

pub trait AlertSound {
    /// Start playing `resource` without blocking.
    fn play(&mut self, resource: &str) -> Result<AlertHandle, AudioError>;

    /// Stop a playback started by [`AlertSound::play`].
    fn stop(&mut self, handle: AlertHandle) -> Result<(), AudioError>;
}

/// Backend for hosts without audio output. Every `play` reports the device as
/// unavailable, so timers expire silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlert;

impl AlertSound for SilentAlert {
    fn play(&mut self, resource: &str) -> Result<AlertHandle, AudioError> {
        Err(AudioError::Unavailable(format!(
            "no audio backend for '{resource}'"
        )))
    }

    fn stop(&mut self, _handle: AlertHandle) -> Result<(), AudioError> {
        Ok(())
    }
}
