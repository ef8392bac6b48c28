//! In-memory tunables for the backend's real-time pipeline: a small
//! `Default`-backed settings struct with no persistence — every field
//! here lives for the process's lifetime only.

use std::time::Duration;

/// Tunables governing the Producer/Callback handshake and the session
/// lifecycle timeouts.
#[derive(Debug, Clone, Copy)]
pub struct BackendConfig {
    /// How long the Producer blocks on the semaphore before re-checking
    /// `kill`/quit-request: 10 ms.
    pub semaphore_wait: Duration,

    /// RingBuffer capacity as a multiple of the host's nominal update
    /// size, so the Producer can stay one callback ahead: 2-3x. Must be
    /// >= 2.
    pub ring_capacity_multiplier: usize,

    /// Interval between `thread_exited` polls during shutdown: 2 ms.
    pub shutdown_poll_interval: Duration,

    /// Number of polls before giving up on a graceful exit and detaching
    /// the worker instead: 20 (so 20 x 2 ms = 40 ms).
    pub shutdown_poll_attempts: u32,

    /// Number of frames of zeroed audio played by the silence-priming
    /// workaround: ~2048 samples.
    pub prime_silence_frames: usize,

    /// Upper bound on how long priming waits for the channel to leave the
    /// playing state: 150 ms.
    pub prime_silence_drain_bound: Duration,

    /// Retry budget for `get_free_channel` in `open_playback`: up to 10
    /// attempts, 50 ms apart.
    pub open_retry_attempts: u32,
    pub open_retry_interval: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            semaphore_wait: Duration::from_millis(10),
            ring_capacity_multiplier: 3,
            shutdown_poll_interval: Duration::from_millis(2),
            shutdown_poll_attempts: 20,
            prime_silence_frames: 2048,
            prime_silence_drain_bound: Duration::from_millis(150),
            open_retry_attempts: 10,
            open_retry_interval: Duration::from_millis(50),
        }
    }
}

impl BackendConfig {
    /// Total bound on the shutdown poll, for logging/assertions.
    pub fn shutdown_poll_bound(&self) -> Duration {
        self.shutdown_poll_interval * self.shutdown_poll_attempts
    }
}
