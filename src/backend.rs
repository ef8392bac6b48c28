//! The top-level vtable this crate exposes to a caller: open/close/reset/
//! stop for playback, plus a capture family that always rejects since
//! nothing downstream of `HostAudio` here implements a capture path.
//!
//! Modeled as a trait (`Backend`) rather than a bare struct, so the
//! boundary a caller links against is a value of an interface type
//! returned by a constructor, not a process-wide function-pointer table.
//! `BackendRegistry` is the thin piece that advertises the device name and
//! hands out that value.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BackendConfig;
use crate::host::HostAudio;
use crate::mixer::Mixer;
use crate::session::DeviceSession;

/// The name this backend registers itself under.
pub const DEVICE_NAME: &str = "s3eSound";

/// The open/reset/stop/close lifecycle a caller drives, for both playback
/// and (always-rejecting) capture. Every method is boolean-returning:
/// failures are logged internally rather than propagated, matching the
/// contract of a caller sitting on the other side of an FFI-shaped
/// boundary.
pub trait Backend: Send + Sync {
    fn device_name(&self) -> &'static str;

    fn open_playback(&self, name: Option<&str>) -> bool;
    fn reset_playback(&self, update_size: usize) -> bool;
    fn stop_playback(&self) -> bool;
    fn close_playback(&self) -> bool;
    fn is_open(&self) -> bool;

    fn open_capture(&self) -> bool;
    fn reset_capture(&self, update_size: usize) -> bool;
    fn stop_capture(&self) -> bool;
    fn close_capture(&self) -> bool;
}

/// One playback device, backed by a single `DeviceSession`. A real
/// deployment would likely keep a small registry of these (one per
/// logical output device); this crate only needs one to demonstrate the
/// full open/reset/stop/close lifecycle, so `S3eSoundBackend` owns it
/// directly rather than through a name-keyed map.
pub struct S3eSoundBackend {
    host: Arc<dyn HostAudio>,
    mixer: Arc<dyn Mixer>,
    config: BackendConfig,
    session: Mutex<Option<Arc<DeviceSession>>>,
}

impl S3eSoundBackend {
    pub fn new(host: Arc<dyn HostAudio>, mixer: Arc<dyn Mixer>) -> Self {
        Self::with_config(host, mixer, BackendConfig::default())
    }

    pub fn with_config(host: Arc<dyn HostAudio>, mixer: Arc<dyn Mixer>, config: BackendConfig) -> Self {
        Self {
            host,
            mixer,
            config,
            session: Mutex::new(None),
        }
    }

    /// A JSON snapshot of the current session, or `"null"` if nothing is
    /// open. Meant for logging/diagnostics, not for driving control flow.
    pub fn diagnostics_json(&self) -> String {
        match self.session.lock().as_ref() {
            Some(session) => serde_json::to_string(&session.diagnostics()).unwrap_or_else(|e| {
                log::warn!("failed to serialize session diagnostics: {e}");
                "null".to_string()
            }),
            None => "null".to_string(),
        }
    }
}

impl Backend for S3eSoundBackend {
    fn device_name(&self) -> &'static str {
        DEVICE_NAME
    }

    /// Opens a channel and primes it. `name`, if present, must match
    /// [`DEVICE_NAME`] or the open is rejected with `DeviceNameMismatch`
    /// before any channel is touched. `None` or the empty string both mean
    /// "the default device", same as a null/empty name at the FFI boundary.
    /// Returns `false` (rather than propagating the error) so this matches
    /// the boolean vtable contract; the underlying `BackendError` is logged.
    fn open_playback(&self, name: Option<&str>) -> bool {
        match DeviceSession::open(self.host.clone(), self.mixer.clone(), self.config, name) {
            Ok(session) => {
                *self.session.lock() = Some(session);
                true
            }
            Err(e) => {
                log::error!("open_playback failed: {e}");
                false
            }
        }
    }

    /// Negotiates format/update size and starts the mixing pipeline.
    /// `update_size` is the frame count the caller intends to pull per
    /// callback invocation (typically the host's reported buffer size).
    fn reset_playback(&self, update_size: usize) -> bool {
        let slot = self.session.lock();
        let Some(session) = slot.as_ref() else {
            log::error!("reset_playback called before open_playback");
            return false;
        };
        match session.reset(update_size) {
            Ok(()) => true,
            Err(e) => {
                log::error!("reset_playback failed: {e}");
                false
            }
        }
    }

    /// Tears down the mixing pipeline but keeps the channel allocated, so
    /// `reset_playback` can be called again without reopening.
    fn stop_playback(&self) -> bool {
        let slot = self.session.lock();
        match slot.as_ref() {
            Some(session) => {
                session.stop();
                true
            }
            None => {
                log::warn!("stop_playback called with no open session");
                false
            }
        }
    }

    /// Fully tears down and releases the session.
    fn close_playback(&self) -> bool {
        let session = self.session.lock().take();
        match session {
            Some(session) => {
                session.close();
                true
            }
            None => {
                log::warn!("close_playback called with no open session");
                false
            }
        }
    }

    fn is_open(&self) -> bool {
        self.session.lock().is_some()
    }

    // Capture is out of scope: nothing in this backend implements a pull
    // path in the opposite direction, so every capture entry point rejects
    // up front instead of pretending to support it.
    fn open_capture(&self) -> bool {
        log::warn!("open_capture rejected: capture is not implemented by this backend");
        false
    }

    fn reset_capture(&self, _update_size: usize) -> bool {
        false
    }

    fn stop_capture(&self) -> bool {
        false
    }

    fn close_capture(&self) -> bool {
        false
    }
}

/// Advertises `DEVICE_NAME` to whatever owns the real-backend registry
/// and constructs the concrete `Backend` implementation, standing in for
/// the vtable-registration step a caller would otherwise do with raw
/// function pointers.
pub struct BackendRegistry;

impl BackendRegistry {
    pub fn device_name() -> &'static str {
        DEVICE_NAME
    }

    pub fn register(host: Arc<dyn HostAudio>, mixer: Arc<dyn Mixer>) -> Arc<dyn Backend> {
        Arc::new(S3eSoundBackend::new(host, mixer))
    }

    pub fn register_with_config(host: Arc<dyn HostAudio>, mixer: Arc<dyn Mixer>, config: BackendConfig) -> Arc<dyn Backend> {
        Arc::new(S3eSoundBackend::with_config(host, mixer, config))
    }
}
