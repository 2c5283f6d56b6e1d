use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::audio::{
    CaptureBackendFactory, CaptureConfig, CaptureSession, CaptureSource, Decoder, PcmEncoder,
    WavContainer,
};
use crate::upload::{AnalysisResult, SpeechClient};

/// Orchestrates one utterance through the pipeline: capture → decode →
/// encode → upload.
///
/// Owns the only `CaptureSession`, so recording lifecycles are serialized by
/// construction: a second recording requires a new `RecordingSession`. The
/// decode and encode stages run to completion once invoked; the only way to
/// cut a recording short is `stop()`, which is always safe.
pub struct RecordingSession {
    config: SessionConfig,
    capture: CaptureSession,
    client: SpeechClient,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, source: CaptureSource) -> Result<Self> {
        let capture_config = CaptureConfig {
            sample_rate: config.sample_rate,
            channels: config.channels,
            buffer_duration_ms: config.buffer_duration_ms,
        };

        let backend = CaptureBackendFactory::create(source, capture_config)
            .context("failed to create capture backend")?;

        let client = SpeechClient::with_timeout(&config.backend_url, config.timeout)
            .context("failed to create backend client")?;

        info!(session_id = %config.session_id, "recording session created");

        Ok(Self {
            config,
            capture: CaptureSession::new(backend),
            client,
            started_at: None,
            stopped_at: None,
        })
    }

    /// Start capturing.
    pub async fn start(&mut self) -> Result<()> {
        self.capture
            .start()
            .await
            .context("failed to start capture")?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Stop capturing and normalize the recording into the canonical WAV
    /// container.
    pub async fn stop(&mut self) -> Result<WavContainer> {
        self.capture.stop().await.context("failed to stop capture")?;
        self.stopped_at = Some(Utc::now());

        let chunks = self.capture.chunks()?;
        let samples = Decoder::new(self.config.sample_rate).decode(chunks)?;
        let container = PcmEncoder::encode(&samples)?;

        info!(
            session_id = %self.config.session_id,
            samples = samples.len(),
            seconds = samples.duration_seconds(),
            container_bytes = container.len(),
            "recording normalized"
        );

        Ok(container)
    }

    /// Hand a normalized container to the analysis backend.
    pub async fn analyze(&self, container: WavContainer) -> Result<AnalysisResult> {
        let result = self
            .client
            .analyze(container, self.config.target_language)
            .await?;
        Ok(result)
    }

    /// Stop, normalize, and upload in one step.
    pub async fn stop_and_analyze(&mut self) -> Result<AnalysisResult> {
        let container = self.stop().await?;
        self.analyze(container).await
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current session statistics.
    pub fn stats(&self) -> SessionStats {
        let (chunks_captured, bytes_captured) = match self.capture.chunks() {
            Ok(chunks) => (chunks.len(), chunks.iter().map(|c| c.len()).sum()),
            Err(_) => (0, 0),
        };

        let duration_secs = match self.started_at {
            Some(started) => {
                let end = self.stopped_at.unwrap_or_else(Utc::now);
                end.signed_duration_since(started).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        };

        SessionStats {
            is_recording: self.capture.is_recording(),
            started_at: self.started_at,
            duration_secs,
            chunks_captured,
            bytes_captured,
        }
    }
}
