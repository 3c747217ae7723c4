//! Shared frame geometry, masks, and raw data types.
//!
//! These mirror the fixed formats the sensor hardware produces: the
//! engine never resizes or reinterprets a frame, it only relays what the
//! device already computed.

use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Color frame width in pixels.
pub const COLOR_WIDTH: usize = 1920;
/// Color frame height in pixels.
pub const COLOR_HEIGHT: usize = 1080;
/// Color channels per pixel (RGBA).
pub const COLOR_CHANNELS: usize = 4;
/// Depth frame width in pixels.
pub const DEPTH_WIDTH: usize = 512;
/// Depth frame height in pixels.
pub const DEPTH_HEIGHT: usize = 424;
/// Infrared frame width in pixels.
pub const IR_WIDTH: usize = 512;
/// Infrared frame height in pixels.
pub const IR_HEIGHT: usize = 424;

/// Tracked body slots the sensor reports.
pub const MAX_BODIES: usize = 6;
/// Per-body property bytes (tracked flag, engagement, hands, detections).
pub const BODY_PROPS: usize = 15;
/// Joints per tracked body.
pub const MAX_JOINTS: usize = 25;
/// Per-joint record ints: tracking state, color x/y, depth x/y, quaternion.
pub const JOINT_PROPS: usize = 9;
/// Fixed-point scale for joint orientation quaternions.
///
/// Orientation floats are stored as `(value * 100000) as i32`, truncated.
/// This is the wire contract of the joint record, not a rounding artifact.
pub const ORIENTATION_SCALE: f32 = 100_000.0;

/// Sub-frame slots in the audio ring accumulator.
pub const AUDIO_RING_LEN: usize = 512;
/// Audio samples per sub-frame.
pub const SUBFRAME_SIZE: usize = 256;
/// Typical upper bound of sub-frames delivered per audio burst.
pub const MAX_SUBFRAMES: usize = 8;

/// Total length of the color buffer in bytes.
pub const COLOR_BUFFER_LEN: usize = COLOR_WIDTH * COLOR_HEIGHT * COLOR_CHANNELS;
/// Total length of the depth buffer in samples.
pub const DEPTH_BUFFER_LEN: usize = DEPTH_WIDTH * DEPTH_HEIGHT;
/// Total length of the infrared buffer in samples.
pub const IR_BUFFER_LEN: usize = IR_WIDTH * IR_HEIGHT;
/// Total length of the audio sample buffer.
pub const AUDIO_BUFFER_LEN: usize = AUDIO_RING_LEN * SUBFRAME_SIZE;
/// Total length of the audio metadata buffer (angle, confidence pairs).
pub const AUDIO_META_LEN: usize = AUDIO_RING_LEN * 2;

/// Bit-set of sensor modalities enabled for a capture session.
///
/// Immutable for the lifetime of a session once `CaptureSession::open`
/// succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorMask(u32);

impl SensorMask {
    pub const NONE: SensorMask = SensorMask(0);
    pub const COLOR: SensorMask = SensorMask(0x0000_0001);
    pub const DEPTH: SensorMask = SensorMask(0x0000_0010);
    pub const INFRARED: SensorMask = SensorMask(0x0000_0100);
    pub const BODY: SensorMask = SensorMask(0x0000_1000);
    pub const AUDIO: SensorMask = SensorMask(0x0001_0000);

    /// All modalities delivered through the synchronized multi-source feed.
    pub const MULTI: SensorMask = SensorMask(0x0000_1111);

    pub fn contains(self, other: SensorMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: SensorMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for SensorMask {
    type Output = SensorMask;

    fn bitor(self, rhs: SensorMask) -> SensorMask {
        SensorMask(self.0 | rhs.0)
    }
}

/// Bit-set of coordinate mapping directions maintained per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingMask(u32);

impl MappingMask {
    pub const NONE: MappingMask = MappingMask(0);
    pub const COLOR_TO_CAMERA: MappingMask = MappingMask(0x0000_0002);
    pub const DEPTH_TO_CAMERA: MappingMask = MappingMask(0x0000_0020);
    pub const DEPTH_TO_COLOR: MappingMask = MappingMask(0x0000_0200);
    pub const COLOR_TO_DEPTH: MappingMask = MappingMask(0x0000_2000);

    pub fn contains(self, other: MappingMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for MappingMask {
    type Output = MappingMask;

    fn bitor(self, rhs: MappingMask) -> MappingMask {
        MappingMask(self.0 | rhs.0)
    }
}

/// A 3-D point in the sensor's camera space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Joint tracking confidence reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrackingState {
    NotTracked = 0,
    Inferred = 1,
    Tracked = 2,
}

impl TrackingState {
    pub fn from_raw(raw: i32) -> TrackingState {
        match raw {
            2 => TrackingState::Tracked,
            1 => TrackingState::Inferred,
            _ => TrackingState::NotTracked,
        }
    }
}

/// One joint as delivered by the device: camera-space position plus
/// orientation, before projection into pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct RawJoint {
    pub tracking: TrackingState,
    pub position: CameraSpacePoint,
    /// Orientation quaternion as (w, x, y, z).
    pub orientation: [f32; 4],
}

impl Default for RawJoint {
    fn default() -> Self {
        RawJoint {
            tracking: TrackingState::NotTracked,
            position: CameraSpacePoint::default(),
            orientation: [0.0; 4],
        }
    }
}

/// One body slot as delivered by the device for a single cycle.
#[derive(Debug, Clone)]
pub struct RawBody {
    pub tracked: bool,
    pub engaged: u8,
    pub restricted: bool,
    pub hand_left_confidence: u8,
    pub hand_left_state: u8,
    pub hand_right_confidence: u8,
    pub hand_right_state: u8,
    /// Expression/activity/appearance detection results, in sensor order.
    pub detections: [u8; 8],
    pub joints: [RawJoint; MAX_JOINTS],
}

impl Default for RawBody {
    fn default() -> Self {
        RawBody {
            tracked: false,
            engaged: 0,
            restricted: false,
            hand_left_confidence: 0,
            hand_left_state: 0,
            hand_right_confidence: 0,
            hand_right_state: 0,
            detections: [0; 8],
            joints: [RawJoint::default(); MAX_JOINTS],
        }
    }
}

/// One synchronized multi-source frame bundle.
///
/// A bundle carries up to one sub-frame per enabled modality for a given
/// capture instant. A `None` sub-frame means the sensor had not produced
/// that modality this cycle; the worker skips it and leaves the previous
/// snapshot in place. Partial bundles are normal, not errors.
#[derive(Debug, Clone, Default)]
pub struct FrameBundle {
    /// RGBA color frame, `COLOR_BUFFER_LEN` bytes.
    pub color: Option<Vec<u8>>,
    /// Depth map, `DEPTH_BUFFER_LEN` samples in millimeters.
    pub depth: Option<Vec<u16>>,
    /// Infrared map, `IR_BUFFER_LEN` samples.
    pub infrared: Option<Vec<u16>>,
    /// Tracked-body slots, at most `MAX_BODIES`.
    pub bodies: Option<Vec<RawBody>>,
}

/// One beam-formed audio segment with its beam metadata.
#[derive(Debug, Clone)]
pub struct AudioSubFrame {
    /// Beam angle in radians.
    pub beam_angle: f32,
    /// Device confidence in the beam angle, 0.0 to 1.0.
    pub beam_confidence: f32,
    pub samples: [f32; SUBFRAME_SIZE],
}

impl Default for AudioSubFrame {
    fn default() -> Self {
        AudioSubFrame {
            beam_angle: 0.0,
            beam_confidence: 0.0,
            samples: [0.0; SUBFRAME_SIZE],
        }
    }
}

/// A burst of audio sub-frames delivered by one beam event.
pub type AudioBurst = Vec<AudioSubFrame>;
