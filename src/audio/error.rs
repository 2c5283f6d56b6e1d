use thiserror::Error;

/// Errors produced by the capture/decode/encode pipeline.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The input device could not be opened (absent, busy, or permission
    /// denied). Not retryable without user action.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Lifecycle misuse, e.g. reading chunks from a session that was never
    /// sealed. A programming error in the orchestration, not a runtime
    /// condition to retry.
    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// The captured byte stream was empty, truncated, or not a recognizable
    /// audio format. Retryable by re-recording.
    #[error("failed to decode captured audio: {0}")]
    DecodeError(String),

    /// The capture backend failed mid-stream.
    #[error("audio capture failed: {0}")]
    CaptureFailed(String),

    /// WAV container emission failed.
    #[error("audio encoding failed: {0}")]
    EncodeFailed(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
