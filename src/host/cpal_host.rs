//! A real `HostAudio` adapter built on cpal's output stream callback.
//!
//! cpal's `build_output_stream` callback is the closest thing the Rust
//! ecosystem has to a pull-audio host contract: the OS/driver invokes it
//! on its own real-time thread, expects the buffer filled synchronously,
//! and will misbehave if the callback blocks. It maps onto `HostAudio`
//! with one simplification: cpal exposes a single default output stream
//! rather than a pool of allocatable "channels", so this adapter only
//! ever hands out one `ChannelId` (`0`) — `get_free_channel` returns
//! `None` once it is taken, same as a real allocator that has run out of
//! channels.
//!
//! This builds its own cpal output stream the ordinary way
//! (`device.build_output_stream` with a `StreamConfig` derived from the
//! negotiated format), but replaces a direct `Mutex<Vec<f32>>` buffer
//! with a pull through `HostCallbackTarget` — i.e. through this backend's
//! own RingBuffer-backed `Callback`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};

use super::{ChannelId, ChannelStatus, GenAudioKind, HostAudio, HostCallbackTarget, SystemData};

const CPAL_CHANNEL: ChannelId = 0;

struct ChannelEntry {
    registrations: HashMap<GenAudioKind, Arc<dyn HostCallbackTarget>>,
    stream: Option<cpal::Stream>,
    status: ChannelStatus,
}

pub struct CpalHost {
    device: cpal::Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    channel: Mutex<Option<ChannelEntry>>,
    start: Instant,
}

impl CpalHost {
    /// Opens the default output device and asks for its default config.
    /// Returns `None` if no output device is available, surfaced to the
    /// caller as "no host to open."
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let supported = device.default_output_config().ok()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        Some(Self {
            device,
            config,
            sample_format,
            channel: Mutex::new(None),
            start: Instant::now(),
        })
    }

    fn build_stream(&self, kind: GenAudioKind, target: Arc<dyn HostCallbackTarget>) -> Result<cpal::Stream, String> {
        let stereo = matches!(kind, GenAudioKind::Stereo);
        let err_fn = |err| log::error!("cpal output stream error: {err}");

        match self.sample_format {
            SampleFormat::F32 => self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        pull_into_f32(&target, data, stereo)
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| format!("failed to build output stream: {e}")),
            SampleFormat::I16 => self
                .device
                .build_output_stream(
                    &self.config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| pull_into_i16(&target, data, stereo),
                    err_fn,
                    None,
                )
                .map_err(|e| format!("failed to build output stream: {e}")),
            other => Err(format!("unsupported cpal sample format: {other:?}")),
        }
    }
}

fn pull_into_i16(target: &Arc<dyn HostCallbackTarget>, data: &mut [i16], stereo: bool) {
    let samples_per_frame = if stereo { 2 } else { 1 };
    let num_samples = data.len() / samples_per_frame;
    let mut sys = SystemData {
        target: data,
        num_samples,
        stereo,
        end_sample: false,
    };
    let _ = target.on_audio_request(&mut sys);
}

fn pull_into_f32(target: &Arc<dyn HostCallbackTarget>, data: &mut [f32], stereo: bool) {
    let samples_per_frame = if stereo { 2 } else { 1 };
    let num_samples = data.len() / samples_per_frame;
    let mut scratch = vec![0i16; data.len()];
    let mut sys = SystemData {
        target: &mut scratch,
        num_samples,
        stereo,
        end_sample: false,
    };
    let _ = target.on_audio_request(&mut sys);
    for (dst, src) in data.iter_mut().zip(scratch.iter()) {
        *dst = *src as f32 / i16::MAX as f32;
    }
}

impl HostAudio for CpalHost {
    fn get_free_channel(&self) -> Option<ChannelId> {
        let mut slot = self.channel.lock().unwrap();
        if slot.is_some() {
            return None;
        }
        *slot = Some(ChannelEntry {
            registrations: HashMap::new(),
            stream: None,
            status: ChannelStatus::Stopped,
        });
        Some(CPAL_CHANNEL)
    }

    fn stereo_enabled(&self) -> bool {
        self.config.channels >= 2
    }

    fn output_frequency(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn channel_status(&self, _channel: ChannelId) -> ChannelStatus {
        self.channel
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.status)
            .unwrap_or(ChannelStatus::Stopped)
    }

    fn channel_register(&self, _channel: ChannelId, kind: GenAudioKind, target: Arc<dyn HostCallbackTarget>) {
        if let Some(entry) = self.channel.lock().unwrap().as_mut() {
            entry.registrations.insert(kind, target);
        }
    }

    fn channel_unregister(&self, _channel: ChannelId, kind: GenAudioKind) {
        if let Some(entry) = self.channel.lock().unwrap().as_mut() {
            entry.registrations.remove(&kind);
            if entry.registrations.is_empty() {
                entry.stream = None;
            }
        }
    }

    fn channel_play(&self, _channel: ChannelId, _buffer: &[i16], _loop_playback: bool) {
        let kind = if self.stereo_enabled() {
            GenAudioKind::Stereo
        } else {
            GenAudioKind::Mono
        };
        let target = {
            let slot = self.channel.lock().unwrap();
            slot.as_ref().and_then(|c| c.registrations.get(&kind).cloned())
        };
        let Some(target) = target else {
            log::warn!("channel_play called before a callback was registered");
            return;
        };

        let stream = match self.build_stream(kind, target) {
            Ok(s) => s,
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        if let Err(e) = stream.play() {
            log::error!("failed to start cpal stream: {e}");
            return;
        }

        if let Some(entry) = self.channel.lock().unwrap().as_mut() {
            entry.stream = Some(stream);
            entry.status = ChannelStatus::Playing;
        }
    }

    fn channel_stop(&self, _channel: ChannelId) {
        if let Some(entry) = self.channel.lock().unwrap().as_mut() {
            entry.stream = None; // dropping the cpal::Stream stops it
            entry.status = ChannelStatus::Stopped;
        }
    }

    fn device_yield(&self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }

    fn check_quit_request(&self) -> bool {
        false
    }

    fn check_pause_request(&self) -> bool {
        false
    }

    fn timer_get_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
