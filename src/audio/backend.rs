use tokio::sync::mpsc;

use super::error::Result;

/// One opaque fragment of compressed audio, exactly as the capture facility
/// produced it. Chunk boundaries are driver-determined; the only guarantee is
/// that concatenating chunks in arrival order reproduces the captured stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk(Vec<u8>);

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Canonical sample rate the pipeline normalizes to
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// How often the backend drains device buffers into chunks (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // 16kHz for speech services
            channels: 1,        // Mono
            buffer_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream, chunks are Ogg/Opus pages
/// - File: replays an audio file's bytes (for batch processing and tests)
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive chunks in arrival order.
    /// The sender side is dropped when the backend stops or fails, which
    /// closes the channel.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>>;

    /// Stop capturing audio and release the underlying device resource
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture source selection
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Default microphone input
    Microphone,
    /// File input (for batch processing and tests)
    File(std::path::PathBuf),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => Ok(Box::new(super::mic::MicrophoneBackend::new(config))),
            CaptureSource::File(path) => Ok(Box::new(super::file::FileBackend::new(path))),
        }
    }
}
