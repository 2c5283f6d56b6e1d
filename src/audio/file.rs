use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioChunk, CaptureBackend};
use super::error::{AudioError, Result};

/// Bytes per replayed chunk. Arbitrary, like real driver chunk boundaries.
const CHUNK_BYTES: usize = 8 * 1024;

/// Capture backend that replays an audio file's bytes as an ordered chunk
/// sequence. Used for batch processing and tests; exercises the exact channel
/// contract of the microphone backend without hardware.
pub struct FileBackend {
    path: PathBuf,
    capturing: Arc<AtomicBool>,
    replay: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capturing: Arc::new(AtomicBool::new(false)),
            replay: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioChunk>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            AudioError::DeviceUnavailable(format!("cannot open {}: {e}", self.path.display()))
        })?;

        info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "replaying audio file as chunk stream"
        );

        let (tx, rx) = mpsc::channel(64);
        let capturing = Arc::clone(&self.capturing);
        capturing.store(true, Ordering::SeqCst);

        let replay = tokio::spawn(async move {
            for chunk in bytes.chunks(CHUNK_BYTES) {
                if tx.send(AudioChunk::new(chunk.to_vec())).await.is_err() {
                    break;
                }
            }
            capturing.store(false, Ordering::SeqCst);
            // tx drops here, closing the channel.
        });

        self.replay = Some(replay);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(replay) = self.replay.take() {
            replay
                .await
                .map_err(|e| AudioError::CaptureFailed(format!("file replay panicked: {e}")))?;
        }
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file"
    }
}
