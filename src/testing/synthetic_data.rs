//! Synthetic sensor data for offline testing.
//!
//! Frame content follows the shapes a real sensor produces (gradient
//! color, banded depth, sine audio) while staying fully deterministic:
//! the same sequence number always generates the same bytes, which the
//! mapping and pause tests rely on.

use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::device::{CoordinateMapper, DepthDevice, DeviceStreams};
use crate::errors::SensorError;
use crate::types::{
    AudioBurst, AudioSubFrame, CameraSpacePoint, FrameBundle, RawBody, RawJoint, SensorMask,
    TrackingState, COLOR_BUFFER_LEN, COLOR_HEIGHT, COLOR_WIDTH, DEPTH_BUFFER_LEN, DEPTH_HEIGHT,
    DEPTH_WIDTH, IR_BUFFER_LEN, MAX_JOINTS, SUBFRAME_SIZE,
};

/// Synthetic color frame: an RGBA gradient that shifts with `seq` so
/// consecutive frames differ.
pub fn synthetic_color_frame(seq: u64) -> Vec<u8> {
    let mut data = vec![0u8; COLOR_BUFFER_LEN];
    let base = (seq % 256) as u8;
    for y in 0..COLOR_HEIGHT {
        for x in 0..COLOR_WIDTH {
            let idx = (y * COLOR_WIDTH + x) * 4;
            data[idx] = base.wrapping_add((x % 256) as u8);
            data[idx + 1] = base.wrapping_add((y % 256) as u8);
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
            data[idx + 3] = 255;
        }
    }
    data
}

/// Synthetic depth frame: diagonal millimeter bands between 0.5 m and 2.5 m.
pub fn synthetic_depth_frame(seq: u64) -> Vec<u16> {
    let mut data = vec![0u16; DEPTH_BUFFER_LEN];
    for y in 0..DEPTH_HEIGHT {
        for x in 0..DEPTH_WIDTH {
            data[y * DEPTH_WIDTH + x] = 500 + (((x + y) as u64 + seq * 7) % 2000) as u16;
        }
    }
    data
}

/// Synthetic infrared frame: intensity ramp shifted by `seq`.
pub fn synthetic_ir_frame(seq: u64) -> Vec<u16> {
    let mut data = vec![0u16; IR_BUFFER_LEN];
    for (i, sample) in data.iter_mut().enumerate() {
        *sample = ((i as u64 + seq * 131) % 65536) as u16;
    }
    data
}

/// One tracked body in slot 0 with joints spread along a deterministic
/// arc at 2 m depth.
pub fn synthetic_bodies(seq: u64) -> Vec<RawBody> {
    let mut body = RawBody {
        tracked: true,
        engaged: 3,
        restricted: false,
        hand_left_confidence: 1,
        hand_left_state: 2,
        hand_right_confidence: 0,
        hand_right_state: 3,
        detections: [3, 1, 2, 1, 1, 1, 1, 3],
        ..RawBody::default()
    };
    for (j, joint) in body.joints.iter_mut().enumerate().take(MAX_JOINTS) {
        let t = j as f32 / MAX_JOINTS as f32;
        *joint = RawJoint {
            tracking: TrackingState::Tracked,
            position: CameraSpacePoint {
                x: t - 0.5 + (seq % 10) as f32 * 0.01,
                y: 0.8 - t * 1.6,
                z: 2.0,
            },
            orientation: [1.0 - t * 0.5, t * 0.25, -t * 0.25, 0.0],
        };
    }
    vec![body]
}

/// A burst of `count` sub-frames of 440 Hz sine audio with a beam angle
/// derived from `seq`.
pub fn synthetic_audio_burst(count: usize, seq: u64) -> AudioBurst {
    let sample_rate = 16000.0f32;
    let mut burst = Vec::with_capacity(count);
    for i in 0..count {
        let mut sub = AudioSubFrame {
            beam_angle: ((seq % 60) as f32 - 30.0).to_radians(),
            beam_confidence: 0.9,
            samples: [0.0; SUBFRAME_SIZE],
        };
        for (s, sample) in sub.samples.iter_mut().enumerate() {
            let n = (seq as usize * count + i) * SUBFRAME_SIZE + s;
            *sample = (2.0 * std::f32::consts::PI * 440.0 * n as f32 / sample_rate).sin() * 0.3;
        }
        burst.push(sub);
    }
    burst
}

/// Deterministic pinhole-model mapper.
///
/// Intrinsics are fixed constants, so identical depth input always yields
/// identical mapping output.
#[derive(Debug, Default)]
pub struct SyntheticMapper;

const COLOR_FX: f32 = 1060.0;
const COLOR_CX: f32 = 960.0;
const COLOR_CY: f32 = 540.0;
const DEPTH_FX: f32 = 365.0;
const DEPTH_CX: f32 = 256.0;
const DEPTH_CY: f32 = 212.0;

impl CoordinateMapper for SyntheticMapper {
    fn camera_to_color(&self, point: CameraSpacePoint) -> (f32, f32) {
        let z = point.z.max(1e-6);
        (
            point.x / z * COLOR_FX + COLOR_CX,
            COLOR_CY - point.y / z * COLOR_FX,
        )
    }

    fn camera_to_depth(&self, point: CameraSpacePoint) -> (f32, f32) {
        let z = point.z.max(1e-6);
        (
            point.x / z * DEPTH_FX + DEPTH_CX,
            DEPTH_CY - point.y / z * DEPTH_FX,
        )
    }

    fn color_frame_to_camera(&self, depth: &[u16], dest: &mut [f32]) {
        let pixels = (dest.len() / 3).min(COLOR_WIDTH * COLOR_HEIGHT);
        for i in 0..pixels {
            let col = (i % COLOR_WIDTH) as f32;
            let row = (i / COLOR_WIDTH) as f32;
            let z = sample_depth_for_color(depth, i);
            dest[i * 3] = (col - COLOR_CX) / COLOR_FX * z;
            dest[i * 3 + 1] = (COLOR_CY - row) / COLOR_FX * z;
            dest[i * 3 + 2] = z;
        }
    }

    fn depth_frame_to_camera(&self, depth: &[u16], dest: &mut [f32]) {
        let pixels = (dest.len() / 3).min(depth.len());
        for i in 0..pixels {
            let col = (i % DEPTH_WIDTH) as f32;
            let row = (i / DEPTH_WIDTH) as f32;
            let z = depth[i] as f32 / 1000.0;
            dest[i * 3] = (col - DEPTH_CX) / DEPTH_FX * z;
            dest[i * 3 + 1] = (DEPTH_CY - row) / DEPTH_FX * z;
            dest[i * 3 + 2] = z;
        }
    }

    fn depth_frame_to_color(&self, depth: &[u16], dest: &mut [f32]) {
        let pixels = (dest.len() / 2).min(depth.len());
        for i in 0..pixels {
            let col = (i % DEPTH_WIDTH) as f32;
            let row = (i / DEPTH_WIDTH) as f32;
            let z = depth[i] as f32 / 1000.0;
            let point = CameraSpacePoint {
                x: (col - DEPTH_CX) / DEPTH_FX * z,
                y: (DEPTH_CY - row) / DEPTH_FX * z,
                z,
            };
            let (cx, cy) = self.camera_to_color(point);
            dest[i * 2] = cx;
            dest[i * 2 + 1] = cy;
        }
    }

    fn color_frame_to_depth(&self, _depth: &[u16], dest: &mut [f32]) {
        let pixels = (dest.len() / 2).min(COLOR_WIDTH * COLOR_HEIGHT);
        let sx = DEPTH_WIDTH as f32 / COLOR_WIDTH as f32;
        let sy = DEPTH_HEIGHT as f32 / COLOR_HEIGHT as f32;
        for i in 0..pixels {
            let col = (i % COLOR_WIDTH) as f32;
            let row = (i / COLOR_WIDTH) as f32;
            dest[i * 2] = col * sx;
            dest[i * 2 + 1] = row * sy;
        }
    }
}

fn sample_depth_for_color(depth: &[u16], color_index: usize) -> f32 {
    let col = color_index % COLOR_WIDTH;
    let row = color_index / COLOR_WIDTH;
    let dcol = col * DEPTH_WIDTH / COLOR_WIDTH;
    let drow = row * DEPTH_HEIGHT / COLOR_HEIGHT;
    depth
        .get(drow * DEPTH_WIDTH + dcol)
        .map(|&d| d as f32 / 1000.0)
        .unwrap_or(0.0)
}

/// Push handle for feeding a [`SyntheticDevice`] from a test thread while
/// a session owns the device itself.
#[derive(Clone)]
pub struct SyntheticFeed {
    frames: Sender<FrameBundle>,
    audio: Sender<AudioBurst>,
}

impl SyntheticFeed {
    pub fn push_frame(&self, bundle: FrameBundle) -> bool {
        self.frames.send(bundle).is_ok()
    }

    pub fn push_audio(&self, burst: AudioBurst) -> bool {
        self.audio.send(burst).is_ok()
    }

    /// Push a bundle carrying every visual modality for `seq`.
    pub fn push_full_frame(&self, seq: u64) -> bool {
        self.push_frame(FrameBundle {
            color: Some(synthetic_color_frame(seq)),
            depth: Some(synthetic_depth_frame(seq)),
            infrared: Some(synthetic_ir_frame(seq)),
            bodies: Some(synthetic_bodies(seq)),
        })
    }
}

/// An in-memory stand-in for a physical depth sensor.
pub struct SyntheticDevice {
    frame_tx: Sender<FrameBundle>,
    frame_rx: Option<Receiver<FrameBundle>>,
    audio_tx: Sender<AudioBurst>,
    audio_rx: Option<Receiver<AudioBurst>>,
    available: bool,
}

impl SyntheticDevice {
    pub fn new() -> SyntheticDevice {
        let (frame_tx, frame_rx) = bounded(64);
        let (audio_tx, audio_rx) = bounded(64);
        SyntheticDevice {
            frame_tx,
            frame_rx: Some(frame_rx),
            audio_tx,
            audio_rx: Some(audio_rx),
            available: true,
        }
    }

    /// A device that fails to open, for exercising the unavailable path.
    pub fn unavailable() -> SyntheticDevice {
        let mut device = Self::new();
        device.available = false;
        device
    }

    pub fn feed(&self) -> SyntheticFeed {
        SyntheticFeed {
            frames: self.frame_tx.clone(),
            audio: self.audio_tx.clone(),
        }
    }
}

impl Default for SyntheticDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthDevice for SyntheticDevice {
    fn open(&mut self, sensors: SensorMask) -> Result<DeviceStreams, SensorError> {
        if !self.available {
            return Err(SensorError::Device("no synthetic sensor present".to_string()));
        }
        Ok(DeviceStreams {
            frames: if sensors.intersects(SensorMask::MULTI) {
                self.frame_rx.take()
            } else {
                None
            },
            audio: if sensors.contains(SensorMask::AUDIO) {
                self.audio_rx.take()
            } else {
                None
            },
            mapper: Arc::new(SyntheticMapper),
        })
    }

    fn close(&mut self) {}
}
