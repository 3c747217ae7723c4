//! Error types for the capture engine.

use thiserror::Error;

/// Errors surfaced at the session boundary.
///
/// Per-cycle conditions (a modality missing from a bundle, an audio
/// overflow) are recovered silently inside the workers and never appear
/// here; only session-fatal or caller-visible conditions do.
#[derive(Debug, Error)]
pub enum SensorError {
    /// No depth sensor device is available, or the device refused to open.
    #[error("sensor device unavailable: {0}")]
    Device(String),

    /// The sensor mask selected no modalities at all.
    #[error("at least one sensor modality must be enabled")]
    NoSensors,

    /// The capture feed stopped advancing within the allowed time.
    #[error("capture feed stalled: {0}")]
    Stalled(String),

    /// The session is already closed.
    #[error("session is closed")]
    Closed,

    /// A worker thread could not be spawned or joined.
    #[error("worker thread error: {0}")]
    Worker(String),

    /// Configuration file could not be read, written, or parsed.
    #[error("config error: {0}")]
    Config(String),
}
