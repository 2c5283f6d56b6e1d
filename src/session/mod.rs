//! Recording session orchestration
//!
//! `RecordingSession` wires the pipeline stages together: it starts and
//! stops the capture session, runs decode and encode over the sealed chunk
//! sequence, and hands the canonical container to the analysis backend.

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::RecordingSession;
pub use stats::SessionStats;
