//! `DeviceSession`: owns the channel, the RingBuffer, the Producer thread,
//! the semaphore, and the lifecycle flags, and implements
//! open/reset/stop/close.
//!
//! Where an earlier variant tracked lifecycle with a heap-allocated
//! struct, a volatile kill flag, and a raw user-data pointer back into it,
//! this uses plain ownership: `configured` is `Some` exactly when the
//! session has a live pipeline, and the Producer/Callback share
//! `Arc`-counted flags instead of a back-pointer into the session.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::callback::Callback;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::frame::FrameFormat;
use crate::host::{ChannelId, GenAudioKind, HostAudio};
use crate::mixer::Mixer;
use crate::prime_silence::prime_silence;
use crate::producer::Producer;
use crate::ring_buffer::RingBuffer;
use crate::semaphore::CountingSemaphore;

struct ConfiguredPipeline {
    frame_format: FrameFormat,
    update_size: usize,
    ring: Arc<RingBuffer>,
    semaphore: Arc<CountingSemaphore>,
    producer: Producer,
    callback: Arc<Callback>,
    gen_audio_kind: GenAudioKind,
}

pub struct DeviceSession {
    channel: ChannelId,
    host: Arc<dyn HostAudio>,
    mixer: Arc<dyn Mixer>,
    config: BackendConfig,
    configured: Mutex<Option<ConfiguredPipeline>>,
}

/// A point-in-time snapshot of session state, serializable for whatever
/// embeds this backend to surface in a diagnostics panel or log line.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionDiagnostics {
    pub channel: ChannelId,
    pub configured: bool,
    pub frame_format: Option<FrameFormat>,
    pub update_size: Option<usize>,
    pub ring_capacity_frames: Option<usize>,
}

impl DeviceSession {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn is_configured(&self) -> bool {
        self.configured.lock().is_some()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        let slot = self.configured.lock();
        match slot.as_ref() {
            Some(pipeline) => SessionDiagnostics {
                channel: self.channel,
                configured: true,
                frame_format: Some(pipeline.frame_format),
                update_size: Some(pipeline.update_size),
                ring_capacity_frames: Some(pipeline.ring.capacity_frames()),
            },
            None => SessionDiagnostics {
                channel: self.channel,
                configured: false,
                frame_format: None,
                update_size: None,
                ring_capacity_frames: None,
            },
        }
    }

    /// Acquires a free channel, probes format capabilities, and runs the
    /// silence-priming workaround. The session holds a channel but no
    /// pipeline on success — `reset` still has to run before audio flows.
    ///
    /// `name`, if present and non-empty, must match [`crate::backend::DEVICE_NAME`]
    /// or this rejects with `DeviceNameMismatch` before touching the host at
    /// all; `None` or `Some("")` both mean "the default device".
    pub fn open(
        host: Arc<dyn HostAudio>,
        mixer: Arc<dyn Mixer>,
        config: BackendConfig,
        name: Option<&str>,
    ) -> Result<Arc<Self>, BackendError> {
        if let Some(name) = name {
            if !name.is_empty() && name != crate::backend::DEVICE_NAME {
                return Err(BackendError::DeviceNameMismatch(name.to_string()));
            }
        }

        let mut channel = None;
        for attempt in 0..config.open_retry_attempts {
            if let Some(c) = host.get_free_channel() {
                channel = Some(c);
                break;
            }
            if attempt + 1 < config.open_retry_attempts {
                host.device_yield(config.open_retry_interval.as_millis() as u32);
            }
        }
        let channel = channel.ok_or(BackendError::ChannelUnavailable {
            attempts: config.open_retry_attempts,
        })?;

        let format = FrameFormat::from_stereo_flag(host.stereo_enabled());
        prime_silence(host.as_ref(), channel, format, &config);

        let session = Arc::new(Self {
            channel,
            host,
            mixer,
            config,
            configured: Mutex::new(None),
        });

        // Registration happens at `reset` time, once the Callback exists
        // — the handle registered is the Callback itself via an `Arc`,
        // never a raw pointer.
        Ok(session)
    }

    /// Negotiates frame size and update size, allocates the RingBuffer,
    /// creates the semaphore, starts the Producer, yields briefly so the
    /// first window is pre-mixed, then starts the channel's infinite
    /// playback.
    pub fn reset(self: &Arc<Self>, update_size_hint: usize) -> Result<(), BackendError> {
        let mut slot = self.configured.lock();
        if slot.is_some() {
            return Err(BackendError::AlreadyConfigured);
        }

        let stereo = self.host.stereo_enabled();
        let frame_format = FrameFormat::from_stereo_flag(stereo);
        let update_size = update_size_hint.max(1);
        let capacity_frames = update_size * self.config.ring_capacity_multiplier;

        let ring = Arc::new(RingBuffer::new(capacity_frames, frame_format));
        let semaphore = Arc::new(CountingSemaphore::new(0));

        let producer = Producer::spawn(
            ring.clone(),
            self.mixer.clone(),
            semaphore.clone(),
            self.host.clone(),
            update_size,
            frame_format.samples_per_frame(),
            self.config,
        )?;

        let callback = Arc::new(Callback::new(
            ring.clone(),
            semaphore.clone(),
            producer.kill_flag(),
            producer.thread_exited_flag(),
            frame_format,
        ));

        let gen_audio_kind = if stereo { GenAudioKind::Stereo } else { GenAudioKind::Mono };
        self.host.channel_register(self.channel, gen_audio_kind, callback.clone());
        // Also register for mono so a stereo-capable channel that later
        // receives mono-format pulls is still serviced.
        if gen_audio_kind == GenAudioKind::Stereo {
            self.host.channel_register(self.channel, GenAudioKind::Mono, callback.clone());
        }

        // Yield briefly so the Producer's first window is pre-mixed before
        // the infinite playback cycle starts.
        self.host.device_yield(1);

        let initial_buffer = vec![0i16; update_size * frame_format.samples_per_frame()];
        self.host.channel_play(self.channel, &initial_buffer, true);

        *slot = Some(ConfiguredPipeline {
            frame_format,
            update_size,
            ring,
            semaphore,
            producer,
            callback,
            gen_audio_kind,
        });
        log::info!(
            "session on channel {} reset: {:?}, update_size={}, ring capacity={}",
            self.channel,
            frame_format,
            update_size,
            capacity_frames
        );
        Ok(())
    }

    /// Sets `kill`, stops the channel, unregisters callbacks, wakes the
    /// Producer, polls `thread_exited` up to the configured bound, then
    /// detaches (the safe equivalent of a hard thread stop) and frees the
    /// pipeline.
    pub fn stop(&self) {
        let pipeline = self.configured.lock().take();
        let Some(pipeline) = pipeline else {
            return; // double stop is a harmless no-op
        };

        pipeline.producer.kill_flag().store(true, Ordering::SeqCst);
        self.host.channel_stop(self.channel);
        self.host.channel_unregister(self.channel, pipeline.gen_audio_kind);
        if pipeline.gen_audio_kind == GenAudioKind::Stereo {
            self.host.channel_unregister(self.channel, GenAudioKind::Mono);
        }
        pipeline.semaphore.post();

        let deadline = Instant::now() + self.config.shutdown_poll_bound();
        let mut exited = pipeline.producer.has_exited();
        while !exited && Instant::now() < deadline {
            self.host.device_yield(self.config.shutdown_poll_interval.as_millis() as u32);
            exited = pipeline.producer.has_exited();
        }

        if exited {
            pipeline.producer.join();
        } else {
            log::warn!(
                "channel {}: producer did not exit within {:?}; detaching",
                self.channel,
                self.config.shutdown_poll_bound()
            );
            pipeline.producer.detach();
        }
        // `ring`/`callback` drop here along with the rest of `pipeline`.
    }

    /// Idempotent channel stop plus dropping any live pipeline. Calls
    /// `stop()` first if a pipeline might still be configured; infallible
    /// from the caller's point of view.
    pub fn close(&self) {
        self.stop();
        self.host.channel_stop(self.channel);
    }
}
