pub mod backend;
pub mod callback;
pub mod config;
pub mod error;
pub mod frame;
pub mod host;
pub mod mixer;
pub mod prime_silence;
pub mod producer;
pub mod ring_buffer;
pub mod semaphore;
pub mod session;

pub use backend::{Backend, BackendRegistry, S3eSoundBackend, DEVICE_NAME};
pub use config::BackendConfig;
pub use error::{BackendError, MixerError};
pub use frame::FrameFormat;
pub use host::{ChannelId, ChannelStatus, GenAudioKind, HostAudio, HostCallbackTarget, SystemData};
pub use mixer::{Mixer, SilenceMixer};
pub use session::{DeviceSession, SessionDiagnostics};
