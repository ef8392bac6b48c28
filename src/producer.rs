//! The mixing worker thread. This is the only thread that ever calls into
//! the external `Mixer`; keeping that true is the core correctness
//! property of the whole pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::host::HostAudio;
use crate::mixer::Mixer;
use crate::ring_buffer::RingBuffer;
use crate::semaphore::CountingSemaphore;

pub struct Producer {
    thread: Option<thread::JoinHandle<()>>,
    kill: Arc<AtomicBool>,
    thread_exited: Arc<AtomicBool>,
}

impl Producer {
    /// Spawns the worker. `update_size` and `frame_size` are fixed for the
    /// worker's lifetime, negotiated once by `reset_playback` before the
    /// thread starts.
    pub fn spawn(
        ring: Arc<RingBuffer>,
        mixer: Arc<dyn Mixer>,
        semaphore: Arc<CountingSemaphore>,
        host: Arc<dyn HostAudio>,
        update_size: usize,
        frame_size: usize,
        config: BackendConfig,
    ) -> Result<Self, BackendError> {
        let kill = Arc::new(AtomicBool::new(false));
        let thread_exited = Arc::new(AtomicBool::new(false));

        let kill_clone = kill.clone();
        let exited_clone = thread_exited.clone();

        let handle = thread::Builder::new()
            .name("s3esound-producer".into())
            .spawn(move || {
                run_loop(ring, mixer, semaphore, host, update_size, frame_size, config, &kill_clone);
                exited_clone.store(true, Ordering::Release);
            })
            .map_err(|e| BackendError::ThreadStartFailure(e.to_string()))?;

        Ok(Self {
            thread: Some(handle),
            kill,
            thread_exited,
        })
    }

    /// Sets `kill` and posts the semaphore so a sleeping worker wakes
    /// promptly. Does not block.
    pub fn signal_kill(&self, semaphore: &CountingSemaphore) {
        self.kill.store(true, Ordering::SeqCst);
        semaphore.post();
    }

    pub fn has_exited(&self) -> bool {
        self.thread_exited.load(Ordering::Acquire)
    }

    /// Shared handle to the same `kill` flag the worker checks every
    /// iteration, so the Callback can observe it too (its `Draining`
    /// state) without a back-reference into the `Producer`.
    pub fn kill_flag(&self) -> Arc<AtomicBool> {
        self.kill.clone()
    }

    /// Shared handle to the same `thread_exited` flag, observed by the
    /// Callback (its `Orphaned` state) and polled by `stop_playback`.
    pub fn thread_exited_flag(&self) -> Arc<AtomicBool> {
        self.thread_exited.clone()
    }

    /// Join the worker thread. Only call after `has_exited()` is observed,
    /// or after giving up on it.
    pub fn join(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Stop waiting for a graceful exit and detach the thread instead.
    /// Rust gives no safe way to forcibly terminate another thread;
    /// detaching is the closest safe equivalent to a hard thread stop —
    /// the thread keeps running until its next `kill` check, but the
    /// session stops waiting on it.
    pub fn detach(mut self) {
        if let Some(handle) = self.thread.take() {
            drop(handle);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    ring: Arc<RingBuffer>,
    mixer: Arc<dyn Mixer>,
    semaphore: Arc<CountingSemaphore>,
    host: Arc<dyn HostAudio>,
    update_size: usize,
    frame_size: usize,
    config: BackendConfig,
    kill: &AtomicBool,
) {
    loop {
        if kill.load(Ordering::Acquire) {
            break;
        }

        let free = ring.free_frames();
        let to_mix = update_size.min(free);

        if to_mix == 0 {
            let woke = semaphore.wait_timeout(config.semaphore_wait);
            if !woke && (host.check_quit_request() || host.check_pause_request()) {
                // A pause request gets the same graceful exit as quit: this
                // pipeline has no paused-but-idle state, only running or
                // torn down, so pausing means stopping the worker and
                // letting a later `reset_playback` build a fresh one.
                kill.store(true, Ordering::SeqCst);
            }
            continue;
        }

        let spans = ring.writable_span();
        let len1 = spans.first.len() / frame_size;
        let len2 = spans.second.len() / frame_size;
        debug_assert_eq!(len1 + len2, to_mix);

        if let Err(e) = mixer.mix(spans.first, len1) {
            log::warn!("mixer failed on primary segment ({len1} frames): {e}; filling silence");
            spans.first.fill(0);
        }
        if len2 > 0 {
            if let Err(e) = mixer.mix(spans.second, len2) {
                log::warn!("mixer failed on wrap segment ({len2} frames): {e}; filling silence");
                spans.second.fill(0);
            }
        }
        ring.commit_write(len1 + len2);
    }
}
