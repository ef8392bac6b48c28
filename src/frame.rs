//! PCM frame format: how many 16-bit samples make up one frame, and the
//! handful of helpers that depend only on that count.

/// Channel layout negotiated at `reset_playback` time. Immutable for the
/// lifetime of a configured session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FrameFormat {
    Mono,
    Stereo,
}

impl FrameFormat {
    /// Number of interleaved 16-bit samples per frame: 1 for mono, 2 for
    /// stereo. This is "frame size" expressed in samples rather than bytes;
    /// the crate stores `i16` samples directly rather than raw bytes.
    pub fn samples_per_frame(self) -> usize {
        match self {
            FrameFormat::Mono => 1,
            FrameFormat::Stereo => 2,
        }
    }

    /// Bytes per frame at 16 bits per sample.
    pub fn bytes_per_frame(self) -> usize {
        self.samples_per_frame() * 2
    }

    pub fn from_stereo_flag(stereo: bool) -> Self {
        if stereo {
            FrameFormat::Stereo
        } else {
            FrameFormat::Mono
        }
    }

    pub fn is_stereo(self) -> bool {
        matches!(self, FrameFormat::Stereo)
    }
}
