use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Canonical sample rate of the encoded container
    pub sample_rate: u32,
    /// Channel count of the encoded container (1 = mono)
    pub channels: u16,
    /// Capture buffer drain cadence in milliseconds
    pub buffer_duration_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the analysis backend
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Target language used when none is given on the command line
    pub default_target_language: String,
}

impl Config {
    /// Load configuration from `<path>.toml`, falling back to built-in
    /// defaults for anything the file omits (or if the file is absent).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "speechbridge")?
            .set_default("audio.sample_rate", 16000)?
            .set_default("audio.channels", 1)?
            .set_default("audio.buffer_duration_ms", 100)?
            .set_default("backend.url", "http://localhost:8000")?
            .set_default("backend.timeout_secs", 60)?
            .set_default("backend.default_target_language", "es")?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let cfg = Config::load("config/does-not-exist").unwrap();
        assert_eq!(cfg.audio.sample_rate, 16000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.backend.default_target_language, "es");
    }
}
