use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether recording is currently active
    pub is_recording: bool,

    /// When the recording started, if it has
    pub started_at: Option<DateTime<Utc>>,

    /// Recording duration in seconds (live value while recording)
    pub duration_secs: f64,

    /// Number of chunks in the sealed sequence (0 until sealed)
    pub chunks_captured: usize,

    /// Total compressed bytes in the sealed sequence (0 until sealed)
    pub bytes_captured: usize,
}
