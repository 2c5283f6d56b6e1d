use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::audio::WavContainer;
use crate::language::Language;

const USER_AGENT: &str = concat!("speechbridge/", env!("CARGO_PKG_VERSION"));

/// Default end-to-end request timeout; transcription of a short utterance can
/// legitimately take tens of seconds.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, UploadError>;

/// Transcription and translation of one utterance, as returned by the
/// analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub transcription: String,
    pub translation: String,
    pub target_language: Option<String>,
}

/// Thin client for the speech analysis backend.
///
/// Performs a single `POST /analyze-audio` with the canonical WAV container
/// and the target language as multipart form data. No retries: retry policy
/// belongs to the caller, not this client.
pub struct SpeechClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SpeechClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Upload one complete WAV container for transcription and translation.
    pub async fn analyze(
        &self,
        container: WavContainer,
        target_language: Language,
    ) -> Result<AnalysisResult> {
        let url = format!("{}/analyze-audio", self.base_url);
        let payload_len = container.len();

        let audio_part = reqwest::multipart::Part::bytes(container.into_bytes())
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("audio", audio_part)
            .text("target_language", target_language.code());

        info!(
            url = %url,
            bytes = payload_len,
            target = %target_language,
            "uploading recording for analysis"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::Timeout
                } else {
                    UploadError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let result: AnalysisResult = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        if result.transcription.trim().is_empty() && result.translation.trim().is_empty() {
            return Err(UploadError::InvalidResponse(
                "backend returned an empty analysis".to_string(),
            ));
        }

        Ok(result)
    }

    /// Whether an error class is worth surfacing as "please try again" to the
    /// user, as opposed to a configuration or backend fault.
    pub fn is_user_retryable(err: &UploadError) -> bool {
        match err {
            UploadError::Network(_) | UploadError::Timeout => true,
            UploadError::Status { status, .. } => *status >= 500,
            UploadError::InvalidResponse(_) => false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = SpeechClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn server_faults_are_user_retryable() {
        assert!(SpeechClient::is_user_retryable(&UploadError::Timeout));
        assert!(SpeechClient::is_user_retryable(&UploadError::Status {
            status: 503,
            message: String::new(),
        }));
        assert!(!SpeechClient::is_user_retryable(&UploadError::Status {
            status: 400,
            message: String::new(),
        }));
        assert!(!SpeechClient::is_user_retryable(&UploadError::InvalidResponse(
            "bad json".to_string()
        )));
    }
}
