pub mod backend;
pub mod capture;
pub mod decode;
pub mod error;
pub mod file;
pub mod mic;
pub mod wav;

pub use backend::{
    AudioChunk, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
pub use capture::{CaptureSession, CaptureState};
pub use decode::{Decoder, SampleBuffer, CANONICAL_SAMPLE_RATE};
pub use error::{AudioError, Result};
pub use file::FileBackend;
pub use mic::MicrophoneBackend;
pub use wav::{PcmEncoder, WavContainer, WAV_HEADER_LEN};
