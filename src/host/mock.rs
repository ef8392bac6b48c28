//! Deterministic `HostAudio` test double, used in this crate's own test
//! suite and meant to be reusable by whatever embeds the backend. Mirrors
//! how `sonido-core`'s tests exercise its processing types directly rather
//! than through a real audio device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use super::{ChannelId, ChannelStatus, GenAudioKind, HostAudio, HostCallbackTarget, SystemData};

struct ChannelState {
    status: ChannelStatus,
    registrations: HashMap<GenAudioKind, Arc<dyn HostCallbackTarget>>,
}

pub struct MockHost {
    next_channel: AtomicU32,
    max_channels: u32,
    stereo_enabled: AtomicBool,
    output_frequency: AtomicU32,
    channels: Mutex<HashMap<ChannelId, ChannelState>>,
    quit_requested: AtomicBool,
    pause_requested: AtomicBool,
    start: Instant,
    yield_count: AtomicU64,
}

impl MockHost {
    pub fn new(output_frequency: u32, stereo_enabled: bool) -> Self {
        Self {
            next_channel: AtomicU32::new(0),
            max_channels: 32,
            stereo_enabled: AtomicBool::new(stereo_enabled),
            output_frequency: AtomicU32::new(output_frequency),
            channels: Mutex::new(HashMap::new()),
            quit_requested: AtomicBool::new(false),
            pause_requested: AtomicBool::new(false),
            start: Instant::now(),
            yield_count: AtomicU64::new(0),
        }
    }

    pub fn with_channel_limit(mut self, max_channels: u32) -> Self {
        self.max_channels = max_channels;
        self
    }

    pub fn request_quit(&self) {
        self.quit_requested.store(true, Ordering::SeqCst);
    }

    pub fn request_pause(&self, pause: bool) {
        self.pause_requested.store(pause, Ordering::SeqCst);
    }

    pub fn set_stereo_enabled(&self, enabled: bool) {
        self.stereo_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_output_frequency(&self, freq: u32) {
        self.output_frequency.store(freq, Ordering::SeqCst);
    }

    pub fn yield_count(&self) -> u64 {
        self.yield_count.load(Ordering::Relaxed)
    }

    /// Simulate the host pulling `num_samples` frames on `channel` through
    /// whichever target is registered for `kind`. Returns the frame count
    /// the callback reports and whether `end_sample` was set, exactly what
    /// a real host would observe from a single invocation.
    pub fn pump(&self, channel: ChannelId, kind: GenAudioKind, num_samples: usize) -> (i32, bool, Vec<i16>) {
        let target = {
            let channels = self.channels.lock().unwrap();
            channels
                .get(&channel)
                .and_then(|c| c.registrations.get(&kind))
                .cloned()
        };
        let Some(target) = target else {
            return (num_samples as i32, true, Vec::new());
        };
        let samples_per_frame = kind.format().samples_per_frame();
        let mut target_buf = vec![0i16; num_samples * samples_per_frame];
        let mut sys = SystemData {
            target: &mut target_buf,
            num_samples,
            stereo: matches!(kind, GenAudioKind::Stereo),
            end_sample: false,
        };
        let produced = target.on_audio_request(&mut sys);
        let end_sample = sys.end_sample;
        (produced, end_sample, target_buf)
    }
}

impl HostAudio for MockHost {
    /// A channel is "free" if it has never been handed out, or if it was
    /// handed out before and is currently stopped; that's the only signal a
    /// real channel pool has to go on, since nothing tells the host a
    /// stopped channel's owner is done with it for good versus about to
    /// reset and play again. Stopped channels are reused (lowest id first)
    /// before a new id is minted, so a sequence of open/stop/close cycles
    /// stabilizes on a small, reused set of ids instead of growing without
    /// bound.
    fn get_free_channel(&self) -> Option<ChannelId> {
        let mut channels = self.channels.lock().unwrap();
        if let Some((&id, state)) = channels
            .iter_mut()
            .filter(|(_, c)| c.status == ChannelStatus::Stopped)
            .min_by_key(|(&id, _)| id)
        {
            state.registrations.clear();
            return Some(id);
        }

        let id = self.next_channel.fetch_add(1, Ordering::SeqCst);
        if id >= self.max_channels {
            return None;
        }
        channels.insert(
            id,
            ChannelState {
                status: ChannelStatus::Stopped,
                registrations: HashMap::new(),
            },
        );
        Some(id)
    }

    fn stereo_enabled(&self) -> bool {
        self.stereo_enabled.load(Ordering::SeqCst)
    }

    fn output_frequency(&self) -> u32 {
        self.output_frequency.load(Ordering::SeqCst)
    }

    fn channel_status(&self, channel: ChannelId) -> ChannelStatus {
        self.channels
            .lock()
            .unwrap()
            .get(&channel)
            .map(|c| c.status)
            .unwrap_or(ChannelStatus::Stopped)
    }

    fn channel_register(&self, channel: ChannelId, kind: GenAudioKind, target: Arc<dyn HostCallbackTarget>) {
        if let Some(c) = self.channels.lock().unwrap().get_mut(&channel) {
            c.registrations.insert(kind, target);
        }
    }

    fn channel_unregister(&self, channel: ChannelId, kind: GenAudioKind) {
        if let Some(c) = self.channels.lock().unwrap().get_mut(&channel) {
            c.registrations.remove(&kind);
        }
    }

    fn channel_play(&self, channel: ChannelId, _buffer: &[i16], _loop_playback: bool) {
        if let Some(c) = self.channels.lock().unwrap().get_mut(&channel) {
            c.status = ChannelStatus::Playing;
        }
    }

    fn channel_stop(&self, channel: ChannelId) {
        if let Some(c) = self.channels.lock().unwrap().get_mut(&channel) {
            c.status = ChannelStatus::Stopped;
        }
    }

    fn device_yield(&self, ms: u32) {
        self.yield_count.fetch_add(1, Ordering::Relaxed);
        std::thread::sleep(std::time::Duration::from_millis(ms as u64));
    }

    fn check_quit_request(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    fn check_pause_request(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    fn timer_get_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}
