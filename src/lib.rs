pub mod audio;
pub mod config;
pub mod language;
pub mod session;
pub mod upload;

pub use audio::{
    AudioChunk, AudioError, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSession,
    CaptureSource, CaptureState, Decoder, FileBackend, MicrophoneBackend, PcmEncoder,
    SampleBuffer, WavContainer, CANONICAL_SAMPLE_RATE, WAV_HEADER_LEN,
};
pub use config::Config;
pub use language::Language;
pub use session::{RecordingSession, SessionConfig, SessionStats};
pub use upload::{AnalysisResult, SpeechClient, UploadError};
