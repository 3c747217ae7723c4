//! Rendering helpers for depth, infrared, and skeleton data.

use image::{Rgb, RgbImage};

use crate::body::Body;
use crate::types::{TrackingState, DEPTH_HEIGHT, DEPTH_WIDTH, IR_HEIGHT, IR_WIDTH};

/// Skeleton topology as (joint, joint) name pairs.
pub const BODY_EDGES: [(&str, &str); 24] = [
    // Torso
    ("head", "neck"),
    ("neck", "spine_shoulder"),
    ("spine_shoulder", "spine_mid"),
    ("spine_mid", "spine_base"),
    ("spine_shoulder", "shoulder_right"),
    ("spine_shoulder", "shoulder_left"),
    ("spine_base", "hip_right"),
    ("spine_base", "hip_left"),
    // Right arm
    ("shoulder_right", "elbow_right"),
    ("elbow_right", "wrist_right"),
    ("wrist_right", "hand_right"),
    ("hand_right", "hand_right_tip"),
    ("wrist_right", "thumb_right"),
    // Left arm
    ("shoulder_left", "elbow_left"),
    ("elbow_left", "wrist_left"),
    ("wrist_left", "hand_left"),
    ("hand_left", "hand_left_tip"),
    ("wrist_left", "thumb_left"),
    // Right leg
    ("hip_right", "knee_right"),
    ("knee_right", "ankle_right"),
    ("ankle_right", "foot_right"),
    // Left leg
    ("hip_left", "knee_left"),
    ("knee_left", "ankle_left"),
    ("ankle_left", "foot_left"),
];

/// Render a depth map as a false-color image for visualization.
///
/// Depth is normalized against the sensor's 8 m range and ramped through
/// hue, so near surfaces read warm and far surfaces read cool.
pub fn depth_map_to_image(depth: &[u16]) -> RgbImage {
    let mut img = RgbImage::new(DEPTH_WIDTH as u32, DEPTH_HEIGHT as u32);
    for (i, &sample) in depth.iter().enumerate().take(DEPTH_WIDTH * DEPTH_HEIGHT) {
        let norm = (sample as f32 / 8000.0).min(1.0);
        let rgb = hsv_to_rgb(norm * 180.0, 150.0 + norm * 100.0, 150.0 + norm * 100.0);
        let x = (i % DEPTH_WIDTH) as u32;
        let y = (i / DEPTH_WIDTH) as u32;
        img.put_pixel(x, y, Rgb(rgb));
    }
    img
}

/// Render an infrared map as a grayscale image.
pub fn ir_to_image(ir: &[u16]) -> RgbImage {
    let mut img = RgbImage::new(IR_WIDTH as u32, IR_HEIGHT as u32);
    for (i, &sample) in ir.iter().enumerate().take(IR_WIDTH * IR_HEIGHT) {
        let level = (sample as f32 / 65535.0 * 255.0) as u8;
        let x = (i % IR_WIDTH) as u32;
        let y = (i / IR_WIDTH) as u32;
        img.put_pixel(x, y, Rgb([level, level, level]));
    }
    img
}

/// Draw a body's skeleton onto a color-space image.
///
/// Edges are drawn only when both joints are fully tracked, unless
/// `allow_inferred` is set.
pub fn draw_skeleton(img: &mut RgbImage, body: &Body, color: Rgb<u8>, allow_inferred: bool) {
    for (name_a, name_b) in BODY_EDGES {
        let (Some(joint_a), Some(joint_b)) = (body.joint(name_a), body.joint(name_b)) else {
            continue;
        };
        let drawable = allow_inferred
            || (joint_a.tracking == TrackingState::Tracked
                && joint_b.tracking == TrackingState::Tracked);
        if drawable {
            draw_line(img, joint_a.color_pos, joint_b.color_pos, color);
        }
    }
}

/// Bresenham line with clipping to the image bounds.
fn draw_line(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
            img.put_pixel(x as u32, y as u32, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// OpenCV-style HSV (H in 0..180, S/V in 0..255) to RGB.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = (h * 2.0).clamp(0.0, 359.99);
    let s = (s / 255.0).clamp(0.0, 1.0);
    let v = (v / 255.0).clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    ]
}
