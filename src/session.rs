//! The capture session: worker lifecycle, pause/resume, and the snapshot
//! export API.
//!
//! A session owns every piece of capture state (buffers, masks, locks,
//! the device handle, and the worker threads) and is the only way to
//! reach any of it. The two workers communicate with the rest of the
//! system exclusively through the buffer set; they hold no reference to
//! each other.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender};

use crate::audio::{decode_audio_frames, AudioAccumulator, AudioFrame};
use crate::body::{decode_bodies, Body};
use crate::buffers::FrameBuffers;
use crate::config::{SessionConfig, StallPolicy};
use crate::device::{CoordinateMapper, DepthDevice};
use crate::errors::SensorError;
use crate::types::{
    AudioBurst, FrameBundle, MappingMask, SensorMask, AUDIO_BUFFER_LEN, AUDIO_META_LEN,
    BODY_PROPS, COLOR_BUFFER_LEN, DEPTH_BUFFER_LEN, IR_BUFFER_LEN, JOINT_PROPS, MAX_BODIES,
    MAX_JOINTS,
};

struct Inner {
    sensors: SensorMask,
    mappings: MappingMask,
    config: SessionConfig,
    buffers: FrameBuffers,
    audio: AudioAccumulator,
    /// Completed multi-source cycles. All buffer writes of a cycle
    /// happen-before the increment for that cycle.
    tick: AtomicU64,
    /// Held by the multi-source worker across its whole buffer-writing
    /// section; held by callers to freeze a coherent multi-buffer view.
    cycle_gate: Mutex<()>,
    mapper: Arc<dyn CoordinateMapper>,
    device: Mutex<Option<Box<dyn DepthDevice>>>,
    closed: AtomicBool,
    multi_terminate: Mutex<Option<Sender<()>>>,
    audio_terminate: Mutex<Option<Sender<()>>>,
    multi_thread: Mutex<Option<JoinHandle<()>>>,
    audio_thread: Mutex<Option<JoinHandle<()>>>,
}

/// A running capture session.
///
/// The session is the sole owner of all capture state. Export methods
/// take `&self` and the type is `Sync`, so consumer threads share a
/// reference (or an `Arc<CaptureSession>`) rather than cloning state.
pub struct CaptureSession {
    inner: Arc<Inner>,
}

/// Holds the multi-source worker paused.
///
/// While the guard lives, the worker may still acquire frames but blocks
/// before touching any buffer, so snapshot calls made under the guard all
/// reflect the same (or an earlier) completed cycle. Dropping the guard
/// resumes the worker.
///
/// Like the plain mutex it wraps, this is not reentrant: taking a second
/// guard from the same thread without releasing the first deadlocks.
pub struct PauseGuard<'a> {
    _gate: MutexGuard<'a, ()>,
}

impl PauseGuard<'_> {
    /// Release the worker. Equivalent to dropping the guard.
    pub fn resume(self) {}
}

impl CaptureSession {
    /// Open the device for the given modalities and start the workers.
    ///
    /// Fails if the sensor mask is empty or the device cannot be opened.
    pub fn open(
        device: Box<dyn DepthDevice>,
        sensors: SensorMask,
        mappings: MappingMask,
    ) -> Result<CaptureSession, SensorError> {
        Self::open_with_config(device, sensors, mappings, SessionConfig::default())
    }

    pub fn open_with_config(
        mut device: Box<dyn DepthDevice>,
        sensors: SensorMask,
        mappings: MappingMask,
        config: SessionConfig,
    ) -> Result<CaptureSession, SensorError> {
        if sensors.is_empty() {
            return Err(SensorError::NoSensors);
        }

        let streams = device.open(sensors)?;
        log::info!(
            "capture session opened (sensors={:#x}, mappings={:#x})",
            sensors.bits(),
            mappings.bits()
        );

        let inner = Arc::new(Inner {
            sensors,
            mappings,
            config,
            buffers: FrameBuffers::default(),
            audio: AudioAccumulator::default(),
            tick: AtomicU64::new(0),
            cycle_gate: Mutex::new(()),
            mapper: streams.mapper,
            device: Mutex::new(Some(device)),
            closed: AtomicBool::new(false),
            multi_terminate: Mutex::new(None),
            audio_terminate: Mutex::new(None),
            multi_thread: Mutex::new(None),
            audio_thread: Mutex::new(None),
        });

        if sensors.intersects(SensorMask::MULTI) {
            let frames = streams.frames.ok_or_else(|| {
                SensorError::Device("device supplied no multi-source stream".to_string())
            })?;
            let (terminate_tx, terminate_rx) = bounded::<()>(1);
            let worker_inner = inner.clone();
            let handle = std::thread::Builder::new()
                .name("depthcam-multi".to_string())
                .spawn(move || multi_worker_loop(worker_inner, frames, terminate_rx))
                .map_err(|e| SensorError::Worker(format!("spawn failed: {e}")))?;
            *inner.multi_terminate.lock().expect("lock poisoned") = Some(terminate_tx);
            *inner.multi_thread.lock().expect("lock poisoned") = Some(handle);
        }

        if sensors.contains(SensorMask::AUDIO) {
            let bursts = streams.audio.ok_or_else(|| {
                SensorError::Device("device supplied no audio stream".to_string())
            })?;
            let (terminate_tx, terminate_rx) = bounded::<()>(1);
            let worker_inner = inner.clone();
            let handle = std::thread::Builder::new()
                .name("depthcam-audio".to_string())
                .spawn(move || audio_worker_loop(worker_inner, bursts, terminate_rx))
                .map_err(|e| SensorError::Worker(format!("audio spawn failed: {e}")))?;
            *inner.audio_terminate.lock().expect("lock poisoned") = Some(terminate_tx);
            *inner.audio_thread.lock().expect("lock poisoned") = Some(handle);
        }

        Ok(CaptureSession { inner })
    }

    /// Signal both workers to terminate, wait for their exit, and release
    /// the device. Once closed a session cannot be restarted; export
    /// calls afterwards return stale data.
    pub fn close(&self) -> Result<(), SensorError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(SensorError::Closed);
        }

        // One-shot signal; dropping the sender afterwards also hangs up
        // the channel, which wakes a worker parked in its bounded select.
        if let Some(tx) = self.inner.multi_terminate.lock().expect("lock poisoned").take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.inner.audio_terminate.lock().expect("lock poisoned").take() {
            let _ = tx.send(());
        }

        let timeout = self.inner.config.join_timeout();
        join_worker(&self.inner.multi_thread, timeout, "multi-source worker")?;
        join_worker(&self.inner.audio_thread, timeout, "audio worker")?;

        if let Some(mut device) = self.inner.device.lock().expect("lock poisoned").take() {
            device.close();
        }
        log::info!("capture session closed");
        Ok(())
    }

    /// Completed multi-source capture cycles. Non-blocking; usable from
    /// any thread for staleness detection.
    pub fn tick(&self) -> u64 {
        self.inner.tick.load(Ordering::Acquire)
    }

    /// Block the multi-source worker at its next cycle boundary and
    /// return a guard holding it there.
    pub fn pause(&self) -> PauseGuard<'_> {
        PauseGuard {
            _gate: self.inner.cycle_gate.lock().expect("lock poisoned"),
        }
    }

    /// Poll until the tick advances past `last_seen` or `timeout` elapses.
    pub fn wait_for_tick(&self, last_seen: u64, timeout: Duration) -> Result<u64, SensorError> {
        let start = Instant::now();
        loop {
            let tick = self.tick();
            if tick > last_seen {
                return Ok(tick);
            }
            if start.elapsed() >= timeout {
                return Err(SensorError::Stalled(format!(
                    "tick did not advance past {} within {:?}",
                    last_seen, timeout
                )));
            }
            std::thread::sleep(self.inner.config.tick_poll());
        }
    }

    /// Copy the latest color frame into `dest` (`COLOR_BUFFER_LEN` bytes).
    pub fn get_color(&self, dest: &mut [u8]) -> bool {
        self.inner.buffers.snapshot_color(dest)
    }

    /// Copy the latest depth map into `dest` (`DEPTH_BUFFER_LEN` samples).
    pub fn get_depth(&self, dest: &mut [u16]) -> bool {
        self.inner.buffers.snapshot_depth(dest)
    }

    /// Copy the latest infrared map into `dest` (`IR_BUFFER_LEN` samples).
    pub fn get_infrared(&self, dest: &mut [u16]) -> bool {
        self.inner.buffers.snapshot_infrared(dest)
    }

    /// Copy the latest body property and joint records.
    pub fn get_body(
        &self,
        body_dest: &mut [[u8; BODY_PROPS]; MAX_BODIES],
        joint_dest: &mut [[[i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES],
    ) -> bool {
        self.inner.buffers.snapshot_bodies(body_dest, joint_dest)
    }

    /// Drain the audio accumulator into the full-size destination buffers
    /// and return how many sub-frames were buffered. Destructive: a second
    /// call right after returns 0. Returns 0 without locking when empty.
    pub fn get_audio(&self, samples_dest: &mut [f32], meta_dest: &mut [f32]) -> usize {
        self.inner.audio.drain(samples_dest, meta_dest)
    }

    pub fn get_map_color_to_camera(&self, dest: &mut [f32]) -> bool {
        self.mapping_valid(MappingMask::COLOR_TO_CAMERA)
            && self.inner.buffers.snapshot_map_color_camera(dest)
    }

    pub fn get_map_depth_to_camera(&self, dest: &mut [f32]) -> bool {
        self.mapping_valid(MappingMask::DEPTH_TO_CAMERA)
            && self.inner.buffers.snapshot_map_depth_camera(dest)
    }

    pub fn get_map_depth_to_color(&self, dest: &mut [f32]) -> bool {
        self.mapping_valid(MappingMask::DEPTH_TO_COLOR)
            && self.inner.buffers.snapshot_map_depth_color(dest)
    }

    pub fn get_map_color_to_depth(&self, dest: &mut [f32]) -> bool {
        self.mapping_valid(MappingMask::COLOR_TO_DEPTH)
            && self.inner.buffers.snapshot_map_color_depth(dest)
    }

    /// The currently tracked bodies, decoded. Untracked slots never
    /// appear here.
    pub fn get_bodies(&self) -> Vec<Body> {
        let mut bodies = [[0u8; BODY_PROPS]; MAX_BODIES];
        let mut joints = [[[0i32; JOINT_PROPS]; MAX_JOINTS]; MAX_BODIES];
        self.get_body(&mut bodies, &mut joints);
        decode_bodies(&bodies, &joints)
    }

    /// Drain and decode the buffered audio sub-frames.
    pub fn get_audio_frames(&self) -> Vec<AudioFrame> {
        let mut samples = vec![0f32; AUDIO_BUFFER_LEN];
        let mut meta = vec![0f32; AUDIO_META_LEN];
        let count = self.get_audio(&mut samples, &mut meta);
        decode_audio_frames(count, &samples, &meta)
    }

    /// Copy out one `FrameSet` of every enabled modality.
    ///
    /// Each buffer is read under its own lock; bracket with [`pause`] for
    /// a cross-buffer same-cycle view.
    pub fn snapshot(&self) -> FrameSet {
        let sensors = self.inner.sensors;
        let mut set = FrameSet {
            index: 0,
            tick: self.tick(),
            color: None,
            depth: None,
            infrared: None,
            bodies: None,
            audio: None,
        };
        if sensors.contains(SensorMask::COLOR) {
            let mut buf = vec![0u8; COLOR_BUFFER_LEN];
            self.get_color(&mut buf);
            set.color = Some(buf);
        }
        if sensors.contains(SensorMask::DEPTH) {
            let mut buf = vec![0u16; DEPTH_BUFFER_LEN];
            self.get_depth(&mut buf);
            set.depth = Some(buf);
        }
        if sensors.contains(SensorMask::INFRARED) {
            let mut buf = vec![0u16; IR_BUFFER_LEN];
            self.get_infrared(&mut buf);
            set.infrared = Some(buf);
        }
        if sensors.contains(SensorMask::BODY) {
            set.bodies = Some(self.get_bodies());
        }
        if sensors.contains(SensorMask::AUDIO) {
            set.audio = Some(self.get_audio_frames());
        }
        set
    }

    /// Iterate snapshots of the enabled modalities, capped at `limit_fps`.
    pub fn frames(&self, limit_fps: f32) -> Frames<'_> {
        Frames {
            session: self,
            index: 0,
            frame_time: Duration::from_secs_f32(1.0 / limit_fps.max(f32::MIN_POSITIVE)),
            last: None,
        }
    }

    fn mapping_valid(&self, direction: MappingMask) -> bool {
        self.inner.mappings.contains(direction)
            && self.inner.sensors.contains(SensorMask::DEPTH)
            && self.tick() > 1
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            if !matches!(e, SensorError::Closed) {
                log::warn!("error closing session in drop: {}", e);
            }
        }
    }
}

/// One snapshot of every enabled modality.
#[derive(Debug, Clone)]
pub struct FrameSet {
    /// Iteration counter when produced by [`CaptureSession::frames`].
    pub index: u64,
    /// The tick observed when the snapshot started.
    pub tick: u64,
    pub color: Option<Vec<u8>>,
    pub depth: Option<Vec<u16>>,
    pub infrared: Option<Vec<u16>>,
    pub bodies: Option<Vec<Body>>,
    pub audio: Option<Vec<AudioFrame>>,
}

/// Rate-capped snapshot iterator. Never ends on its own.
pub struct Frames<'a> {
    session: &'a CaptureSession,
    index: u64,
    frame_time: Duration,
    last: Option<Instant>,
}

impl Iterator for Frames<'_> {
    type Item = FrameSet;

    fn next(&mut self) -> Option<FrameSet> {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }
        }
        self.last = Some(Instant::now());
        let mut set = self.session.snapshot();
        set.index = self.index;
        self.index += 1;
        Some(set)
    }
}

fn join_worker(
    slot: &Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
    name: &str,
) -> Result<(), SensorError> {
    let handle = slot.lock().expect("lock poisoned").take();
    if let Some(handle) = handle {
        let start = Instant::now();
        let mut handle = Some(handle);
        loop {
            if handle.as_ref().is_some_and(|h| h.is_finished()) {
                let _ = handle.take().unwrap().join();
                break;
            }
            if start.elapsed() >= timeout {
                // Best-effort: keep the handle so a later close can retry.
                *slot.lock().expect("lock poisoned") = handle.take();
                return Err(SensorError::Worker(format!(
                    "{} did not exit within {:?}",
                    name, timeout
                )));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
    Ok(())
}

fn multi_worker_loop(inner: Arc<Inner>, frames: Receiver<FrameBundle>, terminate: Receiver<()>) {
    log::debug!("multi-source worker started");
    let timeout = inner.config.worker_timeout();
    // The mapper needs the previous depth frame as context; the worker
    // retains its own copy so mapping never has to take the depth lock.
    let mut last_depth: Vec<u16> = vec![0; DEPTH_BUFFER_LEN];

    loop {
        let bundle = select! {
            recv(frames) -> msg => match msg {
                Ok(bundle) => bundle,
                Err(_) => {
                    log::debug!("frame stream disconnected; multi-source worker exiting");
                    break;
                }
            },
            recv(terminate) -> _ => break,
            default(timeout) => match inner.config.stall_policy {
                StallPolicy::Terminate => {
                    log::warn!(
                        "no synchronized frame within {:?}; multi-source worker exiting",
                        timeout
                    );
                    break;
                }
                StallPolicy::Retry => continue,
            },
        };

        // Frame acquired; everything below happens under the cycle gate so
        // a paused session sees no buffer change and no tick advance.
        let gate = inner.cycle_gate.lock().expect("lock poisoned");
        let completed = inner.tick.load(Ordering::Relaxed);

        if inner.sensors.contains(SensorMask::COLOR) {
            if let Some(color) = &bundle.color {
                inner.buffers.write_color(color);
            }
        }
        if inner.sensors.contains(SensorMask::DEPTH) {
            if let Some(depth) = &bundle.depth {
                inner.buffers.write_depth(depth);
                if depth.len() == last_depth.len() {
                    last_depth.copy_from_slice(depth);
                }
            }
        }
        if inner.sensors.contains(SensorMask::INFRARED) {
            if let Some(infrared) = &bundle.infrared {
                inner.buffers.write_infrared(infrared);
            }
        }
        if inner.sensors.contains(SensorMask::BODY) {
            if let Some(bodies) = &bundle.bodies {
                inner.buffers.write_bodies(bodies, inner.mapper.as_ref());
            }
        }

        // Mapping tables only from the second cycle on.
        if inner.sensors.contains(SensorMask::DEPTH) && completed >= 1 {
            if inner.mappings.contains(MappingMask::COLOR_TO_CAMERA) {
                inner
                    .buffers
                    .write_map_color_camera(&last_depth, inner.mapper.as_ref());
            }
            if inner.mappings.contains(MappingMask::DEPTH_TO_CAMERA) {
                inner
                    .buffers
                    .write_map_depth_camera(&last_depth, inner.mapper.as_ref());
            }
            if inner.mappings.contains(MappingMask::DEPTH_TO_COLOR) {
                inner
                    .buffers
                    .write_map_depth_color(&last_depth, inner.mapper.as_ref());
            }
            if inner.mappings.contains(MappingMask::COLOR_TO_DEPTH) {
                inner
                    .buffers
                    .write_map_color_depth(&last_depth, inner.mapper.as_ref());
            }
        }

        inner.tick.store(completed + 1, Ordering::Release);
        drop(gate);
        // Bundle drops here: per-cycle transients are released outside the gate.
    }
    log::debug!("multi-source worker stopped");
}

fn audio_worker_loop(inner: Arc<Inner>, bursts: Receiver<AudioBurst>, terminate: Receiver<()>) {
    log::debug!("audio worker started");
    let timeout = inner.config.worker_timeout();

    loop {
        let burst = select! {
            recv(bursts) -> msg => match msg {
                Ok(burst) => burst,
                Err(_) => {
                    log::debug!("audio stream disconnected; audio worker exiting");
                    break;
                }
            },
            recv(terminate) -> _ => break,
            default(timeout) => match inner.config.stall_policy {
                StallPolicy::Terminate => {
                    log::warn!("no audio burst within {:?}; audio worker exiting", timeout);
                    break;
                }
                StallPolicy::Retry => continue,
            },
        };

        if burst.is_empty() {
            continue;
        }
        inner.audio.push_burst(&burst);
    }
    log::debug!("audio worker stopped");
}
