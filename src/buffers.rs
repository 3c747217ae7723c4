//! Snapshot buffers for the visual modalities and coordinate mappings.
//!
//! One fixed-size buffer per modality, each behind its own mutex. A
//! buffer always holds the last successfully acquired frame (or zeros
//! before the first one); writes and snapshot copies take the same lock,
//! so readers can never observe a partially written frame.

use std::sync::Mutex;

use crate::device::CoordinateMapper;
use crate::types::{
    RawBody, BODY_PROPS, COLOR_BUFFER_LEN, COLOR_HEIGHT, COLOR_WIDTH, DEPTH_BUFFER_LEN,
    DEPTH_HEIGHT, DEPTH_WIDTH, IR_BUFFER_LEN, JOINT_PROPS, MAX_BODIES, MAX_JOINTS,
    ORIENTATION_SCALE,
};

/// Body slot flags plus fixed-point joint records.
///
/// Layout follows the sensor's export format: `bodies[slot]` is
/// `[tracked, engaged, restricted, hand_left_confidence, hand_left_state,
/// hand_right_confidence, hand_right_state, detections x8]`;
/// `joints[slot][joint]` is `[tracking_state, color_x, color_y, depth_x,
/// depth_y, qw, qx, qy, qz]` with the quaternion in truncated fixed point
/// at [`ORIENTATION_SCALE`].
#[derive(Clone)]
pub struct BodyBuffer {
    pub bodies: [[u8; BODY_PROPS]; MAX_BODIES],
    pub joints: [[[i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
}

impl Default for BodyBuffer {
    fn default() -> Self {
        BodyBuffer {
            bodies: [[0; BODY_PROPS]; MAX_BODIES],
            joints: [[[0; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
        }
    }
}

/// The full modality + mapping buffer set owned by a session.
pub struct FrameBuffers {
    color: Mutex<Box<[u8]>>,
    depth: Mutex<Box<[u16]>>,
    infrared: Mutex<Box<[u16]>>,
    body: Mutex<BodyBuffer>,
    map_color_camera: Mutex<Box<[f32]>>,
    map_depth_camera: Mutex<Box<[f32]>>,
    map_depth_color: Mutex<Box<[f32]>>,
    map_color_depth: Mutex<Box<[f32]>>,
}

impl Default for FrameBuffers {
    fn default() -> Self {
        FrameBuffers {
            color: Mutex::new(vec![0u8; COLOR_BUFFER_LEN].into_boxed_slice()),
            depth: Mutex::new(vec![0u16; DEPTH_BUFFER_LEN].into_boxed_slice()),
            infrared: Mutex::new(vec![0u16; IR_BUFFER_LEN].into_boxed_slice()),
            body: Mutex::new(BodyBuffer::default()),
            map_color_camera: Mutex::new(
                vec![0f32; COLOR_WIDTH * COLOR_HEIGHT * 3].into_boxed_slice(),
            ),
            map_depth_camera: Mutex::new(
                vec![0f32; DEPTH_WIDTH * DEPTH_HEIGHT * 3].into_boxed_slice(),
            ),
            map_depth_color: Mutex::new(
                vec![0f32; DEPTH_WIDTH * DEPTH_HEIGHT * 2].into_boxed_slice(),
            ),
            map_color_depth: Mutex::new(
                vec![0f32; COLOR_WIDTH * COLOR_HEIGHT * 2].into_boxed_slice(),
            ),
        }
    }
}

impl FrameBuffers {
    pub fn write_color(&self, src: &[u8]) {
        let mut buf = self.color.lock().expect("lock poisoned");
        if src.len() == buf.len() {
            buf.copy_from_slice(src);
        }
    }

    pub fn write_depth(&self, src: &[u16]) {
        let mut buf = self.depth.lock().expect("lock poisoned");
        if src.len() == buf.len() {
            buf.copy_from_slice(src);
        }
    }

    pub fn write_infrared(&self, src: &[u16]) {
        let mut buf = self.infrared.lock().expect("lock poisoned");
        if src.len() == buf.len() {
            buf.copy_from_slice(src);
        }
    }

    /// Encode this cycle's body slots into the record buffer.
    ///
    /// Tracked slots get their full property set and per-joint records,
    /// with each joint's camera-space position projected through the
    /// mapper into color and depth pixel coordinates. Untracked slots get
    /// only `tracked = 0`; their remaining fields keep whatever a previous
    /// tracked cycle left behind, so consumers must gate on the flag.
    pub fn write_bodies(&self, bodies: &[RawBody], mapper: &dyn CoordinateMapper) {
        let mut buf = self.body.lock().expect("lock poisoned");
        for (slot, body) in bodies.iter().enumerate().take(MAX_BODIES) {
            let props = &mut buf.bodies[slot];
            props[0] = body.tracked as u8;
            if !body.tracked {
                continue;
            }
            props[1] = body.engaged;
            props[2] = body.restricted as u8;
            props[3] = body.hand_left_confidence;
            props[4] = body.hand_left_state;
            props[5] = body.hand_right_confidence;
            props[6] = body.hand_right_state;
            props[7..7 + body.detections.len()].copy_from_slice(&body.detections);

            for (j, joint) in body.joints.iter().enumerate() {
                let rec = &mut buf.joints[slot][j];
                rec[0] = joint.tracking as i32;
                let (cx, cy) = mapper.camera_to_color(joint.position);
                rec[1] = cx as i32;
                rec[2] = cy as i32;
                let (dx, dy) = mapper.camera_to_depth(joint.position);
                rec[3] = dx as i32;
                rec[4] = dy as i32;
                // Truncating cast is the contract, not f32::round.
                rec[5] = (joint.orientation[0] * ORIENTATION_SCALE) as i32;
                rec[6] = (joint.orientation[1] * ORIENTATION_SCALE) as i32;
                rec[7] = (joint.orientation[2] * ORIENTATION_SCALE) as i32;
                rec[8] = (joint.orientation[3] * ORIENTATION_SCALE) as i32;
            }
        }
    }

    /// Recompute a mapping table in place, under that table's lock.
    pub fn write_map_color_camera(&self, depth: &[u16], mapper: &dyn CoordinateMapper) {
        let mut buf = self.map_color_camera.lock().expect("lock poisoned");
        mapper.color_frame_to_camera(depth, &mut buf);
    }

    pub fn write_map_depth_camera(&self, depth: &[u16], mapper: &dyn CoordinateMapper) {
        let mut buf = self.map_depth_camera.lock().expect("lock poisoned");
        mapper.depth_frame_to_camera(depth, &mut buf);
    }

    pub fn write_map_depth_color(&self, depth: &[u16], mapper: &dyn CoordinateMapper) {
        let mut buf = self.map_depth_color.lock().expect("lock poisoned");
        mapper.depth_frame_to_color(depth, &mut buf);
    }

    pub fn write_map_color_depth(&self, depth: &[u16], mapper: &dyn CoordinateMapper) {
        let mut buf = self.map_color_depth.lock().expect("lock poisoned");
        mapper.color_frame_to_depth(depth, &mut buf);
    }

    /// Copy the color snapshot into `dest`. Returns false on a size
    /// mismatch; no partial copy is ever made.
    pub fn snapshot_color(&self, dest: &mut [u8]) -> bool {
        let buf = self.color.lock().expect("lock poisoned");
        if dest.len() != buf.len() {
            return false;
        }
        dest.copy_from_slice(&buf);
        true
    }

    pub fn snapshot_depth(&self, dest: &mut [u16]) -> bool {
        let buf = self.depth.lock().expect("lock poisoned");
        if dest.len() != buf.len() {
            return false;
        }
        dest.copy_from_slice(&buf);
        true
    }

    pub fn snapshot_infrared(&self, dest: &mut [u16]) -> bool {
        let buf = self.infrared.lock().expect("lock poisoned");
        if dest.len() != buf.len() {
            return false;
        }
        dest.copy_from_slice(&buf);
        true
    }

    pub fn snapshot_bodies(
        &self,
        body_dest: &mut [[u8; BODY_PROPS]; MAX_BODIES],
        joint_dest: &mut [[[i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
    ) -> bool {
        let buf = self.body.lock().expect("lock poisoned");
        *body_dest = buf.bodies;
        *joint_dest = buf.joints;
        true
    }

    pub fn snapshot_map_color_camera(&self, dest: &mut [f32]) -> bool {
        Self::snapshot_map(&self.map_color_camera, dest)
    }

    pub fn snapshot_map_depth_camera(&self, dest: &mut [f32]) -> bool {
        Self::snapshot_map(&self.map_depth_camera, dest)
    }

    pub fn snapshot_map_depth_color(&self, dest: &mut [f32]) -> bool {
        Self::snapshot_map(&self.map_depth_color, dest)
    }

    pub fn snapshot_map_color_depth(&self, dest: &mut [f32]) -> bool {
        Self::snapshot_map(&self.map_color_depth, dest)
    }

    fn snapshot_map(buf: &Mutex<Box<[f32]>>, dest: &mut [f32]) -> bool {
        let buf = buf.lock().expect("lock poisoned");
        if dest.len() != buf.len() {
            return false;
        }
        dest.copy_from_slice(&buf);
        true
    }
}
