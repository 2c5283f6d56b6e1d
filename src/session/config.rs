use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::language::Language;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Canonical sample rate of the pipeline output (the analysis backend
    /// expects 16kHz)
    pub sample_rate: u32,

    /// Channel count of the pipeline output (1 = mono)
    pub channels: u16,

    /// Capture buffer drain cadence
    pub buffer_duration_ms: u64,

    /// Base URL of the analysis backend
    pub backend_url: String,

    /// Upload request timeout
    pub timeout: Duration,

    /// Target translation language
    pub target_language: Language,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("utterance-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
            backend_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(60),
            target_language: Language::Es,
        }
    }
}

impl SessionConfig {
    /// Build a session configuration from the service config, optionally
    /// overriding the configured default target language.
    pub fn from_config(config: &Config, target_language: Option<Language>) -> Result<Self> {
        let target = match target_language {
            Some(lang) => lang,
            None => config
                .backend
                .default_target_language
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?,
        };

        Ok(Self {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            buffer_duration_ms: config.audio.buffer_duration_ms,
            backend_url: config.backend.url.clone(),
            timeout: Duration::from_secs(config.backend.timeout_secs),
            target_language: target,
            ..Self::default()
        })
    }
}
