//! Testing utilities.
//!
//! Provides a synthetic depth device and deterministic coordinate mapper
//! so the capture engine can be exercised offline, without hardware.

pub mod synthetic_data;

pub use synthetic_data::{
    synthetic_audio_burst, synthetic_bodies, synthetic_color_frame, synthetic_depth_frame,
    synthetic_ir_frame, SyntheticDevice, SyntheticFeed, SyntheticMapper,
};
