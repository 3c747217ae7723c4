//! End-to-end capture tests over the synthetic device.
//!
//! These exercise the real worker threads: frames are pushed through the
//! device channels and observed through the snapshot export API.

use std::time::Duration;

use depthcam::testing::{
    synthetic_audio_burst, synthetic_color_frame, synthetic_depth_frame, SyntheticDevice,
    SyntheticMapper,
};
use depthcam::{
    CaptureSession, CoordinateMapper, FrameBundle, MappingMask, RawBody, SensorError, SensorMask,
    SessionConfig, StallPolicy, BODY_PROPS, COLOR_BUFFER_LEN, DEPTH_BUFFER_LEN, IR_BUFFER_LEN,
    JOINT_PROPS, MAX_BODIES, MAX_JOINTS,
};

const WAIT: Duration = Duration::from_secs(5);

/// Short waits, retry-on-idle so slow CI machines cannot kill a worker.
fn test_config() -> SessionConfig {
    SessionConfig {
        worker_timeout_ms: 200,
        stall_policy: StallPolicy::Retry,
        tick_poll_ms: 5,
        join_timeout_ms: 2000,
    }
}

fn open_session(
    sensors: SensorMask,
    mappings: MappingMask,
) -> (CaptureSession, depthcam::testing::SyntheticFeed) {
    let device = SyntheticDevice::new();
    let feed = device.feed();
    let session =
        CaptureSession::open_with_config(Box::new(device), sensors, mappings, test_config())
            .expect("session should open");
    (session, feed)
}

#[test]
fn test_open_rejects_empty_mask() {
    let device = SyntheticDevice::new();
    let result = CaptureSession::open(Box::new(device), SensorMask::NONE, MappingMask::NONE);
    assert!(matches!(result, Err(SensorError::NoSensors)));
}

#[test]
fn test_open_fails_when_device_unavailable() {
    let device = SyntheticDevice::unavailable();
    let result = CaptureSession::open(Box::new(device), SensorMask::COLOR, MappingMask::NONE);
    assert!(matches!(result, Err(SensorError::Device(_))));
}

#[test]
fn test_first_cycle_populates_enabled_buffers() {
    let sensors = SensorMask::COLOR | SensorMask::DEPTH | SensorMask::INFRARED | SensorMask::BODY;
    let (session, feed) = open_session(sensors, MappingMask::NONE);

    assert_eq!(session.tick(), 0);
    assert!(feed.push_full_frame(1));
    let tick = session.wait_for_tick(0, WAIT).expect("first cycle");
    assert!(tick >= 1);

    let mut color = vec![0u8; COLOR_BUFFER_LEN];
    assert!(session.get_color(&mut color));
    assert!(color.iter().any(|&b| b != 0));

    let mut depth = vec![0u16; DEPTH_BUFFER_LEN];
    assert!(session.get_depth(&mut depth));
    assert!(depth.iter().any(|&d| d != 0));

    let mut ir = vec![0u16; IR_BUFFER_LEN];
    assert!(session.get_infrared(&mut ir));
    assert!(ir.iter().any(|&s| s != 0));

    let bodies = session.get_bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].tracked);
}

#[test]
fn test_partial_bundle_leaves_other_buffers_unchanged() {
    let (session, feed) = open_session(SensorMask::COLOR | SensorMask::DEPTH, MappingMask::NONE);

    // Cycle 1 delivers only color.
    assert!(feed.push_frame(FrameBundle {
        color: Some(synthetic_color_frame(1)),
        ..FrameBundle::default()
    }));
    session.wait_for_tick(0, WAIT).unwrap();

    let mut depth = vec![0u16; DEPTH_BUFFER_LEN];
    assert!(session.get_depth(&mut depth));
    assert!(depth.iter().all(|&d| d == 0), "depth must stay zeroed");

    // Cycle 2 delivers only depth; color keeps the cycle-1 frame.
    assert!(feed.push_frame(FrameBundle {
        depth: Some(synthetic_depth_frame(2)),
        ..FrameBundle::default()
    }));
    session.wait_for_tick(1, WAIT).unwrap();

    let mut color = vec![0u8; COLOR_BUFFER_LEN];
    assert!(session.get_color(&mut color));
    assert_eq!(color, synthetic_color_frame(1));
}

#[test]
fn test_audio_drain_is_idempotent_to_empty() {
    let (session, feed) = open_session(SensorMask::AUDIO, MappingMask::NONE);

    assert!(feed.push_audio(synthetic_audio_burst(3, 1)));

    // The worker appends asynchronously; poll the destructive read.
    let mut drained = 0;
    for _ in 0..500 {
        let frames = session.get_audio_frames();
        if !frames.is_empty() {
            drained = frames.len();
            assert!((frames[0].beam_confidence - 0.9).abs() < 1e-6);
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(drained, 3);

    // Immediately after a drain there is nothing left.
    assert!(session.get_audio_frames().is_empty());
}

#[test]
fn test_mapping_invalid_until_second_cycle() {
    let (session, feed) = open_session(
        SensorMask::COLOR | SensorMask::DEPTH,
        MappingMask::DEPTH_TO_CAMERA | MappingMask::DEPTH_TO_COLOR,
    );

    let mut map = vec![0f32; DEPTH_BUFFER_LEN * 3];
    assert!(!session.get_map_depth_to_camera(&mut map));

    assert!(feed.push_full_frame(1));
    session.wait_for_tick(0, WAIT).unwrap();
    assert!(
        !session.get_map_depth_to_camera(&mut map),
        "one completed cycle is not enough for the mapper"
    );

    assert!(feed.push_full_frame(2));
    session.wait_for_tick(1, WAIT).unwrap();
    assert!(session.get_map_depth_to_camera(&mut map));

    // Deterministic: the table matches the mapper applied to the depth
    // frame of the cycle that produced it.
    let mut expected = vec![0f32; DEPTH_BUFFER_LEN * 3];
    SyntheticMapper.depth_frame_to_camera(&synthetic_depth_frame(2), &mut expected);
    assert_eq!(map, expected);
}

#[test]
fn test_mapping_direction_not_in_mask_reports_invalid() {
    let (session, feed) = open_session(
        SensorMask::COLOR | SensorMask::DEPTH,
        MappingMask::DEPTH_TO_CAMERA,
    );
    assert!(feed.push_full_frame(1));
    assert!(feed.push_full_frame(2));
    session.wait_for_tick(1, WAIT).unwrap();

    let mut map = vec![0f32; DEPTH_BUFFER_LEN * 2];
    assert!(!session.get_map_depth_to_color(&mut map));
}

#[test]
fn test_pause_freezes_tick_and_buffers() {
    let (session, feed) = open_session(SensorMask::COLOR | SensorMask::DEPTH, MappingMask::NONE);

    assert!(feed.push_full_frame(1));
    session.wait_for_tick(0, WAIT).unwrap();

    let guard = session.pause();
    assert!(feed.push_full_frame(2));

    // The worker may acquire the bundle but must block before writing.
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(session.tick(), 1);

    let mut first = vec![0u8; COLOR_BUFFER_LEN];
    assert!(session.get_color(&mut first));
    std::thread::sleep(Duration::from_millis(50));
    let mut second = vec![0u8; COLOR_BUFFER_LEN];
    assert!(session.get_color(&mut second));
    assert_eq!(first, second);
    assert_eq!(session.tick(), 1);
    assert_eq!(first, synthetic_color_frame(1));

    guard.resume();
    let tick = session.wait_for_tick(1, WAIT).expect("resume releases the worker");
    assert_eq!(tick, 2);
    let mut after = vec![0u8; COLOR_BUFFER_LEN];
    assert!(session.get_color(&mut after));
    assert_eq!(after, synthetic_color_frame(2));
}

#[test]
fn test_untracked_slots_keep_stale_data_but_never_decode() {
    let (session, feed) = open_session(SensorMask::BODY, MappingMask::NONE);

    assert!(feed.push_frame(FrameBundle {
        bodies: Some(depthcam::testing::synthetic_bodies(1)),
        ..FrameBundle::default()
    }));
    session.wait_for_tick(0, WAIT).unwrap();
    assert_eq!(session.get_bodies().len(), 1);

    // The same slot goes untracked.
    assert!(feed.push_frame(FrameBundle {
        bodies: Some(vec![RawBody::default()]),
        ..FrameBundle::default()
    }));
    session.wait_for_tick(1, WAIT).unwrap();

    let mut bodies = [[0u8; BODY_PROPS]; MAX_BODIES];
    let mut joints = [[[0i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES];
    assert!(session.get_body(&mut bodies, &mut joints));
    assert_eq!(bodies[0][0], 0);
    // Joint data is stale leftovers from the tracked cycle...
    assert!(joints[0].iter().flatten().any(|&v| v != 0));
    // ...and the decode layer refuses to surface it.
    assert!(session.get_bodies().is_empty());
}

#[test]
fn test_end_to_end_color_depth_body() {
    let sensors = SensorMask::COLOR | SensorMask::DEPTH | SensorMask::BODY;
    let (session, feed) = open_session(sensors, MappingMask::DEPTH_TO_CAMERA);

    assert!(feed.push_full_frame(1));
    let tick = session.wait_for_tick(0, WAIT).unwrap();
    assert_eq!(tick, 1);
    let mut map = vec![0f32; DEPTH_BUFFER_LEN * 3];
    assert!(!session.get_map_depth_to_camera(&mut map));

    assert!(feed.push_full_frame(2));
    let tick = session.wait_for_tick(1, WAIT).unwrap();
    assert_eq!(tick, 2);
    assert!(session.get_map_depth_to_camera(&mut map));

    let mut expected = vec![0f32; DEPTH_BUFFER_LEN * 3];
    SyntheticMapper.depth_frame_to_camera(&synthetic_depth_frame(2), &mut expected);
    assert_eq!(map, expected);

    let bodies = session.get_bodies();
    assert_eq!(bodies.len(), 1);
    let head = bodies[0].joint("head").unwrap();
    // Joints were projected through the mapper into both pixel spaces.
    assert!(head.color_pos.0 > 0);
    assert!(head.depth_pos.0 > 0);
}

#[test]
fn test_stalled_feed_terminates_worker() {
    let device = SyntheticDevice::new();
    let feed = device.feed();
    let config = SessionConfig {
        worker_timeout_ms: 50,
        stall_policy: StallPolicy::Terminate,
        tick_poll_ms: 5,
        join_timeout_ms: 2000,
    };
    let session = CaptureSession::open_with_config(
        Box::new(device),
        SensorMask::COLOR,
        MappingMask::NONE,
        config,
    )
    .unwrap();

    // No frames arrive; the worker gives up after its bounded wait. The
    // only caller-visible symptom is a tick that never advances.
    std::thread::sleep(Duration::from_millis(300));
    assert!(session
        .wait_for_tick(0, Duration::from_millis(100))
        .is_err());
    assert_eq!(session.tick(), 0);
    // The dead worker dropped its receiver, so the feed is hung up.
    assert!(!feed.push_full_frame(1));

    session.close().expect("close joins the dead worker");
}

#[test]
fn test_close_twice_reports_closed() {
    let (session, _feed) = open_session(SensorMask::COLOR, MappingMask::NONE);
    session.close().unwrap();
    assert!(matches!(session.close(), Err(SensorError::Closed)));
}

#[test]
fn test_frames_iterator_yields_snapshots() {
    let (session, feed) = open_session(SensorMask::COLOR | SensorMask::DEPTH, MappingMask::NONE);
    assert!(feed.push_full_frame(1));
    session.wait_for_tick(0, WAIT).unwrap();

    let sets: Vec<_> = session.frames(200.0).take(2).collect();
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].index, 0);
    assert_eq!(sets[1].index, 1);
    for set in &sets {
        assert!(set.color.is_some());
        assert!(set.depth.is_some());
        assert!(set.infrared.is_none());
        assert!(set.tick >= 1);
    }
}
