//! The device boundary: everything below this trait is sensor driver
//! territory and out of the engine's hands.
//!
//! A [`DepthDevice`] turns hardware frame-arrived events into messages on
//! plain channels. The workers wait on those channels with a bounded
//! timeout, which is the whole extent of their coupling to the hardware.

use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::errors::SensorError;
use crate::types::{AudioBurst, CameraSpacePoint, FrameBundle, SensorMask};

/// Per-frame coordinate transforms between the sensor's spaces.
///
/// Stateless per call. Only valid once the device has seen at least one
/// depth frame; the multi-source worker enforces the second-cycle guard
/// before asking for full-frame tables.
pub trait CoordinateMapper: Send + Sync {
    /// Project a camera-space point into color-space pixel coordinates.
    fn camera_to_color(&self, point: CameraSpacePoint) -> (f32, f32);

    /// Project a camera-space point into depth-space pixel coordinates.
    fn camera_to_depth(&self, point: CameraSpacePoint) -> (f32, f32);

    /// Map every color pixel to camera space. `dest` is 3 floats per pixel.
    fn color_frame_to_camera(&self, depth: &[u16], dest: &mut [f32]);

    /// Map every depth pixel to camera space. `dest` is 3 floats per pixel.
    fn depth_frame_to_camera(&self, depth: &[u16], dest: &mut [f32]);

    /// Map every depth pixel to color space. `dest` is 2 floats per pixel.
    fn depth_frame_to_color(&self, depth: &[u16], dest: &mut [f32]);

    /// Map every color pixel to depth space. `dest` is 2 floats per pixel.
    fn color_frame_to_depth(&self, depth: &[u16], dest: &mut [f32]);
}

/// Channels and capabilities handed back by a successfully opened device.
pub struct DeviceStreams {
    /// Synchronized frame bundles, one per capture instant. `None` when
    /// no multi-source modality is enabled.
    pub frames: Option<Receiver<FrameBundle>>,
    /// Audio beam bursts. `None` when audio is not enabled.
    pub audio: Option<Receiver<AudioBurst>>,
    /// The device's coordinate mapping capability.
    pub mapper: Arc<dyn CoordinateMapper>,
}

/// An opaque depth-sensing device.
///
/// Implementations own the driver handle and deliver data exclusively
/// through the [`DeviceStreams`] channels. The session keeps the device
/// for the lifetime of the capture and calls [`DepthDevice::close`] on
/// teardown; there is no mid-life reopen.
pub trait DepthDevice: Send {
    /// Open the device for the given modalities and begin delivering
    /// frames. Fails if no physical sensor is available.
    fn open(&mut self, sensors: SensorMask) -> Result<DeviceStreams, SensorError>;

    /// Release the device. Senders held by the driver are dropped, which
    /// hangs up the stream channels.
    fn close(&mut self);
}
