//! `prime_silence`: the documented workaround for a host quirk where
//! streaming misbehaves unless a short silence buffer is played first.
//! Runs once, synchronously, on the calling thread during `open_playback`
//! — never on the Producer or Callback.

use crate::config::BackendConfig;
use crate::frame::FrameFormat;
use crate::host::{ChannelId, ChannelStatus, HostAudio};

/// Plays `config.prime_silence_frames` of zeroed audio on `channel`, yields
/// briefly, stops the channel, then polls (bounded to
/// `config.prime_silence_drain_bound`) for it to leave the playing state.
pub fn prime_silence(host: &dyn HostAudio, channel: ChannelId, format: FrameFormat, config: &BackendConfig) {
    let silence = vec![0i16; config.prime_silence_frames * format.samples_per_frame()];
    host.channel_play(channel, &silence, false);
    host.device_yield(1);
    host.channel_stop(channel);

    let bound_ms = config.prime_silence_drain_bound.as_millis() as u64;
    let deadline = host.timer_get_ms().saturating_add(bound_ms);
    while host.channel_status(channel) == ChannelStatus::Playing && host.timer_get_ms() < deadline {
        host.device_yield(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::MockHost;

    #[test]
    fn stops_the_channel_after_priming() {
        let host = MockHost::new(44100, false);
        let channel = host.get_free_channel().unwrap();
        host.channel_play(channel, &[0; 4], true);
        assert_eq!(host.channel_status(channel), ChannelStatus::Playing);

        prime_silence(&host, channel, FrameFormat::Mono, &BackendConfig::default());
        assert_eq!(host.channel_status(channel), ChannelStatus::Stopped);
    }
}
