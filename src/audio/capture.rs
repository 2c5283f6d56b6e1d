use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioChunk, CaptureBackend};
use super::error::{AudioError, Result};

/// Lifecycle of a capture session. Sealed is terminal: a new session must be
/// constructed for a new recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Sealed,
}

impl CaptureState {
    pub fn name(self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Sealed => "sealed",
        }
    }
}

/// One capture-to-stop cycle.
///
/// Owns the capture backend (and through it the device resource) and the
/// ordered chunk buffer. Chunks arrive over the backend's channel and are
/// appended in arrival order by a collector task that is joined on `stop()`.
///
/// `stop()` outside the Recording state is an idempotent no-op: it never
/// touches the device and never double-releases it. The chunk sequence is
/// readable only once the session is Sealed.
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    state: CaptureState,
    chunks: Vec<AudioChunk>,
    collector: Option<JoinHandle<Vec<AudioChunk>>>,
}

impl CaptureSession {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            state: CaptureState::Idle,
            chunks: Vec::new(),
            collector: None,
        }
    }

    /// Open the device and begin appending arriving chunks.
    ///
    /// Fails with `DeviceUnavailable` if the device cannot be opened; the
    /// session stays Idle and holds no resource in that case. Calling
    /// `start()` on a Recording or Sealed session is `InvalidState`.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(AudioError::InvalidState {
                expected: "idle",
                actual: self.state.name(),
            });
        }

        let mut rx = self.backend.start().await?;

        let collector = tokio::spawn(async move {
            let mut chunks = Vec::new();
            while let Some(chunk) = rx.recv().await {
                chunks.push(chunk);
            }
            chunks
        });

        self.collector = Some(collector);
        self.state = CaptureState::Recording;
        info!(backend = self.backend.name(), "recording started");
        Ok(())
    }

    /// Finalize the stream, release the device, and seal the chunk sequence.
    ///
    /// Always safe to call: outside the Recording state this is a logged
    /// no-op. The device is released even when the backend reports a stop
    /// error; whatever chunks arrived before the failure remain sealed.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state != CaptureState::Recording {
            warn!(
                state = self.state.name(),
                "stop() called outside recording, ignoring"
            );
            return Ok(());
        }

        // Stopping the backend drops the chunk sender, which ends the
        // collector loop.
        let stop_result = self.backend.stop().await;

        if let Some(collector) = self.collector.take() {
            match collector.await {
                Ok(chunks) => self.chunks = chunks,
                Err(e) => {
                    self.state = CaptureState::Sealed;
                    return Err(AudioError::CaptureFailed(format!(
                        "chunk collector panicked: {e}"
                    )));
                }
            }
        }

        self.state = CaptureState::Sealed;
        stop_result?;

        let bytes: usize = self.chunks.iter().map(|c| c.len()).sum();
        info!(chunks = self.chunks.len(), bytes, "recording sealed");
        Ok(())
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    /// The complete ordered chunk sequence. `InvalidState` until Sealed, so
    /// decode attempts on a live session are rejected.
    pub fn chunks(&self) -> Result<&[AudioChunk]> {
        if self.state != CaptureState::Sealed {
            return Err(AudioError::InvalidState {
                expected: "sealed",
                actual: self.state.name(),
            });
        }
        Ok(&self.chunks)
    }

    /// Consume the session, yielding the sealed chunk sequence.
    pub fn into_chunks(self) -> Result<Vec<AudioChunk>> {
        if self.state != CaptureState::Sealed {
            return Err(AudioError::InvalidState {
                expected: "sealed",
                actual: self.state.name(),
            });
        }
        Ok(self.chunks)
    }
}
