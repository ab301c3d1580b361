//! Frame-Grab: capture a few frames from a V4L2 device and save them to disk
//!
//! The device is driven through the [`CameraDevice`] and [`CaptureStream`]
//! traits, so the whole capture run can be exercised against a mock device
//! as well as real hardware.

pub mod app;
pub mod capture;
pub mod codec;
pub mod config;
pub mod device;
pub mod negotiation;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use app::{run, RunError};
pub use capture::CaptureSummary;
pub use config::{Args, CaptureConfig, OutputMode};
pub use device::V4L2Device;
pub use traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FormatDescription,
    FourCC, Frame, FrameMetadata, FrameSize,
};
