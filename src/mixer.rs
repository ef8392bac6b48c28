//! The Mixer: an external mixing engine this crate never constructs
//! itself, only calls into through this trait from the Producer thread.

use crate::error::MixerError;

/// Synchronously fills `dest` with `nframes` worth of interleaved 16-bit
/// PCM. `dest.len()` is always `nframes * frame_size` for whatever
/// `FrameFormat` the session negotiated.
///
/// Implementations may take their own internal locks — that is exactly
/// why `mix` must never be called from the HostAudio callback thread,
/// only from the Producer.
pub trait Mixer: Send + Sync {
    fn mix(&self, dest: &mut [i16], nframes: usize) -> Result<(), MixerError>;
}

/// A trivial Mixer that always fills with digital silence. Useful as a
/// default/test double and as the Producer's own fallback when a real
/// Mixer call fails.
pub struct SilenceMixer;

impl Mixer for SilenceMixer {
    fn mix(&self, dest: &mut [i16], _nframes: usize) -> Result<(), MixerError> {
        dest.fill(0);
        Ok(())
    }
}
