//! HostAudio: the external pull-callback audio subsystem, modeled here
//! only so `DeviceSession`/`Backend` have something concrete to call, and
//! so tests can drive the pipeline deterministically without real
//! hardware.
//!
//! The trait covers exactly the host calls this backend consumes:
//! free-channel allocation, int queries, callback register/unregister,
//! channel play/stop, a cooperative yield, a quit/pause probe, and a
//! monotonic millisecond clock.

pub mod mock;

#[cfg(feature = "cpal-host")]
pub mod cpal_host;

use std::sync::Arc;

use crate::frame::FrameFormat;

/// Opaque channel handle, as allocated by `get_free_channel`.
pub type ChannelId = u32;

/// Which of the two channel-registered audio-generation events this
/// registration is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenAudioKind {
    Mono,
    Stereo,
}

impl GenAudioKind {
    pub fn format(self) -> FrameFormat {
        match self {
            GenAudioKind::Mono => FrameFormat::Mono,
            GenAudioKind::Stereo => FrameFormat::Stereo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Playing,
    Stopped,
}

/// The data passed to a registered callback on each pull. `end_sample` is
/// the one out-parameter: setting it true tells the host this is the last
/// buffer — the return-full-on-empty policy still applies even then.
pub struct SystemData<'a> {
    pub target: &'a mut [i16],
    pub num_samples: usize,
    pub stereo: bool,
    pub end_sample: bool,
}

/// What `channel_register` hands the host: the thing invoked on every pull.
/// A trait object behind an `Arc` rather than a raw pointer into
/// caller-owned memory, resolved into a live target by the host (or, in
/// tests, by `MockHost::pump`).
pub trait HostCallbackTarget: Send + Sync {
    /// Returns the number of frames actually produced: always
    /// `system_data.num_samples`, either with real data or under the
    /// return-full-on-empty policy.
    fn on_audio_request(&self, system_data: &mut SystemData<'_>) -> i32;
}

/// The external Host Audio API.
pub trait HostAudio: Send + Sync {
    /// Retries are the caller's responsibility (`open_playback`): `None`
    /// here means "no free channel right now."
    fn get_free_channel(&self) -> Option<ChannelId>;

    fn stereo_enabled(&self) -> bool;
    fn output_frequency(&self) -> u32;
    fn channel_status(&self, channel: ChannelId) -> ChannelStatus;

    fn channel_register(&self, channel: ChannelId, kind: GenAudioKind, target: Arc<dyn HostCallbackTarget>);
    fn channel_unregister(&self, channel: ChannelId, kind: GenAudioKind);

    /// Starts (or primes) playback of `buffer` on `channel`. `loop_playback
    /// = true` is the infinite playback cycle `reset_playback` kicks off;
    /// `false` is used by `prime_silence`'s one-shot silence buffer.
    fn channel_play(&self, channel: ChannelId, buffer: &[i16], loop_playback: bool);
    fn channel_stop(&self, channel: ChannelId);

    /// Cooperative yield, never a blocking sleep from the Callback's own
    /// thread — only the session and `prime_silence` call this.
    fn device_yield(&self, ms: u32);

    fn check_quit_request(&self) -> bool;
    fn check_pause_request(&self) -> bool;
    fn timer_get_ms(&self) -> u64;
}
