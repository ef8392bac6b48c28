//! The Callback: the function HostAudio invokes on its restricted
//! real-time thread. Must never sleep, yield, or take a lock the Mixer
//! might hold — it only ever touches the RingBuffer and a pair of atomic
//! flags.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::frame::FrameFormat;
use crate::host::{HostCallbackTarget, SystemData};
use crate::ring_buffer::RingBuffer;
use crate::semaphore::CountingSemaphore;

/// Per-session state the Callback observes. `Running` is the only state
/// where real frames move; `Draining` and `Orphaned` both collapse to
/// "set end_sample, return num_samples."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Running,
    Draining,
    Orphaned,
}

/// Holds exactly the state the Callback is allowed to touch: the shared
/// RingBuffer, the semaphore it posts after every successful read, and the
/// two shutdown flags it only ever reads.
pub struct Callback {
    ring: Arc<RingBuffer>,
    semaphore: Arc<CountingSemaphore>,
    kill: Arc<AtomicBool>,
    thread_exited: Arc<AtomicBool>,
    frame_format: FrameFormat,
}

impl Callback {
    pub fn new(
        ring: Arc<RingBuffer>,
        semaphore: Arc<CountingSemaphore>,
        kill: Arc<AtomicBool>,
        thread_exited: Arc<AtomicBool>,
        frame_format: FrameFormat,
    ) -> Self {
        Self {
            ring,
            semaphore,
            kill,
            thread_exited,
            frame_format,
        }
    }

    fn state(&self) -> CallbackState {
        if self.thread_exited.load(Ordering::Acquire) {
            CallbackState::Orphaned
        } else if self.kill.load(Ordering::Acquire) {
            CallbackState::Draining
        } else {
            CallbackState::Running
        }
    }

    /// Services one pull from the host. Never blocks, never calls the
    /// Mixer.
    pub fn service_request(&self, system_data: &mut SystemData<'_>) -> i32 {
        match self.state() {
            CallbackState::Draining | CallbackState::Orphaned => {
                system_data.end_sample = true;
                return system_data.num_samples as i32;
            }
            CallbackState::Running => {}
        }

        let avail = self.ring.readable_frames();
        if avail == 0 {
            // Host-quirk policy: pretend success rather than block or hand
            // back a short count. Destination is left as-is.
            return system_data.num_samples as i32;
        }

        let to_write = system_data.num_samples.min(avail);
        let spans = self.ring.readable_span();
        let frame_size = self.frame_format.samples_per_frame();

        let len1_frames = (spans.first.len() / frame_size).min(to_write);
        let len1_samples = len1_frames * frame_size;
        system_data.target[..len1_samples].copy_from_slice(&spans.first[..len1_samples]);

        let len2_frames = to_write - len1_frames;
        if len2_frames > 0 {
            let len2_samples = len2_frames * frame_size;
            // The wrap segment lands after the first segment's bytes, not
            // at the start of `target` — an earlier variant got this
            // offset wrong and clobbered the start of the buffer.
            system_data.target[len1_samples..len1_samples + len2_samples]
                .copy_from_slice(&spans.second[..len2_samples]);
        }

        self.ring.commit_read(to_write);
        self.semaphore.post();

        to_write as i32
    }
}

impl HostCallbackTarget for Callback {
    fn on_audio_request(&self, system_data: &mut SystemData<'_>) -> i32 {
        self.service_request(system_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn fresh(capacity: usize, format: FrameFormat) -> (Callback, Arc<RingBuffer>, Arc<AtomicBool>, Arc<AtomicBool>) {
        let ring = Arc::new(RingBuffer::new(capacity, format));
        let semaphore = Arc::new(CountingSemaphore::new(0));
        let kill = Arc::new(AtomicBool::new(false));
        let thread_exited = Arc::new(AtomicBool::new(false));
        let cb = Callback::new(ring.clone(), semaphore, kill.clone(), thread_exited.clone(), format);
        (cb, ring, kill, thread_exited)
    }

    #[test]
    fn empty_ring_returns_full_count_without_touching_destination() {
        let (cb, _ring, _kill, _exited) = fresh(8, FrameFormat::Mono);
        let mut target = vec![99i16; 4];
        let mut sys = SystemData {
            target: &mut target,
            num_samples: 4,
            stereo: false,
            end_sample: false,
        };
        let produced = cb.service_request(&mut sys);
        assert_eq!(produced, 4);
        assert!(!sys.end_sample);
        assert_eq!(target, vec![99, 99, 99, 99]);
    }

    #[test]
    fn reads_wrap_segment_at_correct_offset() {
        let (cb, ring, _kill, _exited) = fresh(4, FrameFormat::Mono);
        // Write 3, drain 3, write 3 more so the occupied region wraps.
        {
            let spans = ring.writable_span();
            spans.first[..3].copy_from_slice(&[1, 2, 3]);
        }
        ring.commit_write(3);
        ring.commit_read(3);
        {
            let spans = ring.writable_span();
            spans.first[0] = 4;
            spans.second[..2].copy_from_slice(&[5, 6]);
        }
        ring.commit_write(3);

        let mut target = vec![0i16; 3];
        let mut sys = SystemData {
            target: &mut target,
            num_samples: 3,
            stereo: false,
            end_sample: false,
        };
        let produced = cb.service_request(&mut sys);
        assert_eq!(produced, 3);
        assert_eq!(target, vec![4, 5, 6]);
    }

    #[test]
    fn kill_sets_end_sample_and_returns_full_count() {
        let (cb, ring, kill, _exited) = fresh(8, FrameFormat::Mono);
        {
            let spans = ring.writable_span();
            spans.first[..4].copy_from_slice(&[1, 2, 3, 4]);
        }
        ring.commit_write(4);
        kill.store(true, Ordering::SeqCst);

        let mut target = vec![0i16; 4];
        let mut sys = SystemData {
            target: &mut target,
            num_samples: 4,
            stereo: false,
            end_sample: false,
        };
        let produced = cb.service_request(&mut sys);
        assert_eq!(produced, 4);
        assert!(sys.end_sample);
        // Draining: no data copied even though the ring had some queued.
        assert_eq!(target, vec![0, 0, 0, 0]);
    }

    #[test]
    fn orphaned_thread_behaves_like_draining() {
        let (cb, _ring, _kill, thread_exited) = fresh(8, FrameFormat::Mono);
        thread_exited.store(true, Ordering::SeqCst);
        let mut target = vec![0i16; 2];
        let mut sys = SystemData {
            target: &mut target,
            num_samples: 2,
            stereo: false,
            end_sample: false,
        };
        assert_eq!(cb.service_request(&mut sys), 2);
        assert!(sys.end_sample);
    }

    #[test]
    fn partial_fill_reports_actual_frames_written() {
        let (cb, ring, _kill, _exited) = fresh(8, FrameFormat::Mono);
        {
            let spans = ring.writable_span();
            spans.first[..2].copy_from_slice(&[7, 8]);
        }
        ring.commit_write(2);

        let mut target = vec![0i16; 5];
        let mut sys = SystemData {
            target: &mut target,
            num_samples: 5,
            stereo: false,
            end_sample: false,
        };
        let produced = cb.service_request(&mut sys);
        assert_eq!(produced, 2);
        assert_eq!(&target[..2], &[7, 8]);
    }
}
