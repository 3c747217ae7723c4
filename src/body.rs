//! Typed decode of the raw body and joint records.
//!
//! The export API hands out the sensor's packed arrays (`u8` properties,
//! fixed-point `i32` joints). This module turns them into `Body`/`Joint`
//! values: tracking gates, hand states, and the quaternion decoded from
//! its fixed-point encoding. Consumers must always gate on `tracked`:
//! untracked slots carry stale joint data by contract.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::types::{TrackingState, BODY_PROPS, JOINT_PROPS, MAX_BODIES, MAX_JOINTS, ORIENTATION_SCALE};

/// Joint names in sensor index order.
pub const JOINT_NAMES: [&str; MAX_JOINTS] = [
    "spine_base",
    "spine_mid",
    "neck",
    "head",
    "shoulder_left",
    "elbow_left",
    "wrist_left",
    "hand_left",
    "shoulder_right",
    "elbow_right",
    "wrist_right",
    "hand_right",
    "hip_left",
    "knee_left",
    "ankle_left",
    "foot_left",
    "hip_right",
    "knee_right",
    "ankle_right",
    "foot_right",
    "spine_shoulder",
    "hand_left_tip",
    "thumb_left",
    "hand_right_tip",
    "thumb_right",
];

lazy_static! {
    static ref JOINT_INDEX: HashMap<&'static str, usize> = JOINT_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i))
        .collect();
}

/// Look up a joint's sensor index by name.
pub fn joint_index(name: &str) -> Option<usize> {
    JOINT_INDEX.get(name).copied()
}

/// Hand pose reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandState {
    Unknown = 0,
    NotTracked = 1,
    Open = 2,
    Closed = 3,
    Lasso = 4,
}

impl HandState {
    pub fn from_raw(raw: u8) -> HandState {
        match raw {
            2 => HandState::Open,
            3 => HandState::Closed,
            4 => HandState::Lasso,
            1 => HandState::NotTracked,
            _ => HandState::Unknown,
        }
    }
}

/// Tri-state detection result for expressions and activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DetectionResult {
    Unknown = 0,
    No = 1,
    Maybe = 2,
    Yes = 3,
}

impl DetectionResult {
    pub fn from_raw(raw: u8) -> DetectionResult {
        match raw {
            3 => DetectionResult::Yes,
            2 => DetectionResult::Maybe,
            1 => DetectionResult::No,
            _ => DetectionResult::Unknown,
        }
    }
}

/// One decoded joint.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: &'static str,
    pub tracking: TrackingState,
    /// Projected position in color-space pixels.
    pub color_pos: (i32, i32),
    /// Projected position in depth-space pixels.
    pub depth_pos: (i32, i32),
    /// Orientation quaternion (w, x, y, z), decoded from fixed point.
    pub orientation: [f32; 4],
    /// Hand pose, present only for the hand joints.
    pub hand_state: Option<HandState>,
    /// High-confidence flag for the hand pose, only for the hand joints.
    pub hand_confidence: Option<bool>,
}

/// One decoded body slot.
#[derive(Debug, Clone)]
pub struct Body {
    pub index: usize,
    pub tracked: bool,
    pub engaged: DetectionResult,
    pub restricted: bool,
    props: [u8; BODY_PROPS],
    joints: [[i32; JOINT_PROPS]; MAX_JOINTS],
}

impl Body {
    /// Decode one slot from the raw export arrays.
    pub fn from_raw(
        index: usize,
        props: &[u8; BODY_PROPS],
        joints: &[[i32; JOINT_PROPS]; MAX_JOINTS],
    ) -> Body {
        Body {
            index,
            tracked: props[0] != 0,
            engaged: DetectionResult::from_raw(props[1]),
            restricted: props[2] != 0,
            props: *props,
            joints: *joints,
        }
    }

    /// Decode a joint by sensor index.
    pub fn joint_at(&self, index: usize) -> Option<Joint> {
        let name = *JOINT_NAMES.get(index)?;
        let rec = &self.joints[index];
        let (hand_state, hand_confidence) = match name {
            "hand_left" => (
                Some(HandState::from_raw(self.props[4])),
                Some(self.props[3] != 0),
            ),
            "hand_right" => (
                Some(HandState::from_raw(self.props[6])),
                Some(self.props[5] != 0),
            ),
            _ => (None, None),
        };
        Some(Joint {
            name,
            tracking: TrackingState::from_raw(rec[0]),
            color_pos: (rec[1], rec[2]),
            depth_pos: (rec[3], rec[4]),
            orientation: [
                rec[5] as f32 / ORIENTATION_SCALE,
                rec[6] as f32 / ORIENTATION_SCALE,
                rec[7] as f32 / ORIENTATION_SCALE,
                rec[8] as f32 / ORIENTATION_SCALE,
            ],
            hand_state,
            hand_confidence,
        })
    }

    /// Decode a joint by name.
    pub fn joint(&self, name: &str) -> Option<Joint> {
        self.joint_at(joint_index(name)?)
    }

    /// Iterate all joints in sensor order.
    pub fn joints(&self) -> impl Iterator<Item = Joint> + '_ {
        (0..MAX_JOINTS).filter_map(move |i| self.joint_at(i))
    }
}

/// Decode the export arrays into the tracked bodies only.
///
/// Untracked slots are skipped entirely: their joint data is stale by
/// contract and must never surface as a `Body`.
pub fn decode_bodies(
    bodies: &[[u8; BODY_PROPS]; MAX_BODIES],
    joints: &[[[i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
) -> Vec<Body> {
    (0..MAX_BODIES)
        .filter(|&i| bodies[i][0] != 0)
        .map(|i| Body::from_raw(i, &bodies[i], &joints[i]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_fixture() -> (
        [[u8; BODY_PROPS]; MAX_BODIES],
        [[[i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
    ) {
        let mut bodies = [[0u8; BODY_PROPS]; MAX_BODIES];
        let mut joints = [[[0i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES];
        bodies[2][0] = 1;
        bodies[2][3] = 1; // hand_left high confidence
        bodies[2][4] = 3; // hand_left closed
        bodies[2][6] = 4; // hand_right lasso
        let head = joint_index("head").unwrap();
        joints[2][head] = [2, 960, 540, 256, 212, 70710, 0, -70710, 12345];
        (bodies, joints)
    }

    #[test]
    fn test_decode_skips_untracked_slots() {
        let (bodies, joints) = raw_fixture();
        let decoded = decode_bodies(&bodies, &joints);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].index, 2);
        assert!(decoded[0].tracked);
    }

    #[test]
    fn test_joint_decode_fixed_point() {
        let (bodies, joints) = raw_fixture();
        let body = &decode_bodies(&bodies, &joints)[0];
        let head = body.joint("head").unwrap();
        assert_eq!(head.tracking, TrackingState::Tracked);
        assert_eq!(head.color_pos, (960, 540));
        assert_eq!(head.depth_pos, (256, 212));
        assert!((head.orientation[0] - 0.7071).abs() < 1e-4);
        assert!((head.orientation[2] + 0.7071).abs() < 1e-4);
        assert!((head.orientation[3] - 0.12345).abs() < 1e-6);
        assert!(head.hand_state.is_none());
    }

    #[test]
    fn test_hand_joints_carry_state() {
        let (bodies, joints) = raw_fixture();
        let body = &decode_bodies(&bodies, &joints)[0];
        let left = body.joint("hand_left").unwrap();
        assert_eq!(left.hand_state, Some(HandState::Closed));
        assert_eq!(left.hand_confidence, Some(true));
        let right = body.joint("hand_right").unwrap();
        assert_eq!(right.hand_state, Some(HandState::Lasso));
        assert_eq!(right.hand_confidence, Some(false));
    }

    #[test]
    fn test_joint_index_lookup() {
        assert_eq!(joint_index("spine_base"), Some(0));
        assert_eq!(joint_index("thumb_right"), Some(24));
        assert_eq!(joint_index("mouth"), None);
    }

    #[test]
    fn test_joints_iterator_covers_all() {
        let (bodies, joints) = raw_fixture();
        let body = &decode_bodies(&bodies, &joints)[0];
        assert_eq!(body.joints().count(), MAX_JOINTS);
    }
}
