//! Error taxonomy for the backend.
//!
//! `open_playback`/`reset_playback` collapse these to `bool` at the vtable
//! boundary, but internally every fallible step returns a typed error so
//! the reason is in the log before it is thrown away.

use thiserror::Error;

/// Failures that can occur while acquiring or configuring a session.
#[derive(Debug, Error)]
pub enum BackendError {
    /// `open_playback` could not obtain a free channel after retrying.
    #[error("no free channel available after {attempts} attempts")]
    ChannelUnavailable { attempts: u32 },

    /// RingBuffer (or other session) allocation failed.
    #[error("allocation failed: {0}")]
    AllocationFailure(String),

    /// The Producer thread could not be started.
    #[error("failed to start mixing worker thread: {0}")]
    ThreadStartFailure(String),

    /// `reset_playback` was called on a session that is already configured.
    #[error("session is already configured; call stop_playback first")]
    AlreadyConfigured,

    /// A lifecycle operation was attempted on a session that does not own
    /// the named device, or the device name did not match this backend.
    #[error("device name '{0}' does not match this backend")]
    DeviceNameMismatch(String),
}

/// Producer-side failure of the external Mixer. Recoverable: the Producer
/// logs it, zero-fills the region it was about to mix, and continues.
#[derive(Debug, Error)]
#[error("mixer failed to fill {requested} frames: {reason}")]
pub struct MixerError {
    pub requested: usize,
    pub reason: String,
}

impl MixerError {
    pub fn new(requested: usize, reason: impl Into<String>) -> Self {
        Self {
            requested,
            reason: reason.into(),
        }
    }
}
