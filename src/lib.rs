//! DepthCam: concurrent multi-modal capture engine for depth-sensing cameras
//!
//! This crate continuously aggregates synchronized color/depth/infrared/body
//! frames and an independent audio beam stream from a depth sensor, and
//! exposes the latest complete snapshot of each modality to any number of
//! consumer threads without tearing.
//!
//! # Features
//! - Two independent background workers (multi-source frames, audio bursts)
//! - Per-buffer locking: snapshot reads never observe a torn frame
//! - Pause/resume gate for coherent multi-buffer views
//! - Monotonic tick counter for staleness detection
//! - Coordinate-space mapping cache (color/depth/camera spaces)
//! - Fixed-capacity audio accumulator with destructive drain
//! - Synthetic device for offline testing
//!
//! # Usage
//! ```rust,no_run
//! use depthcam::{CaptureSession, MappingMask, SensorMask};
//! use depthcam::testing::SyntheticDevice;
//!
//! let device = Box::new(SyntheticDevice::new());
//! let session = CaptureSession::open(
//!     device,
//!     SensorMask::COLOR | SensorMask::DEPTH | SensorMask::BODY,
//!     MappingMask::DEPTH_TO_CAMERA,
//! )?;
//!
//! let mut color = vec![0u8; depthcam::COLOR_BUFFER_LEN];
//! if session.get_color(&mut color) {
//!     // latest color snapshot, never torn
//! }
//! # Ok::<(), depthcam::SensorError>(())
//! ```

pub mod audio;
pub mod body;
pub mod buffers;
pub mod config;
pub mod device;
pub mod errors;
pub mod session;
pub mod testing;
pub mod types;
pub mod visualize;

// Re-exports for convenience
pub use audio::AudioFrame;
pub use body::{Body, DetectionResult, HandState, Joint};
pub use config::{SessionConfig, StallPolicy};
pub use device::{CoordinateMapper, DepthDevice, DeviceStreams};
pub use errors::SensorError;
pub use session::{CaptureSession, FrameSet, PauseGuard};
pub use types::{
    AudioBurst, AudioSubFrame, CameraSpacePoint, FrameBundle, MappingMask, RawBody, RawJoint,
    SensorMask, TrackingState, AUDIO_BUFFER_LEN, AUDIO_META_LEN, AUDIO_RING_LEN, BODY_PROPS,
    COLOR_BUFFER_LEN, COLOR_CHANNELS, COLOR_HEIGHT, COLOR_WIDTH, DEPTH_BUFFER_LEN, DEPTH_HEIGHT,
    DEPTH_WIDTH, IR_BUFFER_LEN, IR_HEIGHT, IR_WIDTH, JOINT_PROPS, MAX_BODIES, MAX_JOINTS,
    SUBFRAME_SIZE,
};

/// Initialize logging for the capture engine
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "depthcam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
