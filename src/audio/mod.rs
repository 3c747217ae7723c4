//! Audio beam accumulation for the capture engine.
//!
//! Submodules:
//! - `ring`: fixed-capacity sub-frame accumulator with destructive drain
//! - `frames`: typed audio frame decode and merging

mod frames;
mod ring;

pub use frames::{decode_audio_frames, merge_audio_frames, AudioFrame};
pub use ring::{AudioAccumulator, AudioRing};
