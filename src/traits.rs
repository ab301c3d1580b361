//! Core traits and types for V4L2 capture device abstraction.

use std::fmt;
use std::time::Duration;

/// Pixel format representation (e.g., MJPG, YUYV).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// MPEG elementary stream.
    pub const MPEG: Self = Self::new(b"MPEG");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
    /// Plain JPEG frames.
    pub const JPEG: Self = Self::new(b"JPEG");
    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");

    /// Bytes per pixel for packed formats, `None` for compressed ones.
    #[must_use]
    pub fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            Self::YUYV => Some(2),
            Self::RGB3 => Some(3),
            _ => None,
        }
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride), zero for compressed formats.
    pub stride: u32,
    /// Total frame size in bytes, zero when the driver decides.
    pub size: u32,
}

impl Format {
    /// Create a new format specification.
    ///
    /// Stride and size are left at zero when they do not fit in a `u32`; the
    /// driver fills in the real values on `set_format`.
    #[must_use]
    pub fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let stride = fourcc
            .bytes_per_pixel()
            .and_then(|bpp| width.checked_mul(bpp))
            .unwrap_or(0);
        Self {
            width,
            height,
            fourcc,
            stride,
            size: stride.checked_mul(height).unwrap_or(0),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {} (stride {}, size {})",
            self.width, self.height, self.fourcc, self.stride, self.size
        )
    }
}

/// A pixel format offered by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescription {
    /// Enumeration index reported by the driver.
    pub index: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Human readable driver description.
    pub description: String,
    /// Whether the payload is compressed.
    pub compressed: bool,
}

/// A frame size supported for one pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSize {
    /// A single fixed resolution.
    Discrete {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A range of resolutions on a step grid.
    Stepwise {
        /// Smallest width.
        min_width: u32,
        /// Largest width.
        max_width: u32,
        /// Width increment.
        step_width: u32,
        /// Smallest height.
        min_height: u32,
        /// Largest height.
        max_height: u32,
        /// Height increment.
        step_height: u32,
    },
}

impl FrameSize {
    /// Smallest width covered by this size.
    #[must_use]
    pub const fn min_width(&self) -> u32 {
        match *self {
            Self::Discrete { width, .. } => width,
            Self::Stepwise { min_width, .. } => min_width,
        }
    }

    /// Smallest height covered by this size.
    #[must_use]
    pub const fn min_height(&self) -> u32 {
        match *self {
            Self::Discrete { height, .. } => height,
            Self::Stepwise { min_height, .. } => min_height,
        }
    }

    /// Whether `width`x`height` can be configured with this size.
    #[must_use]
    pub fn supports(&self, width: u32, height: u32) -> bool {
        match *self {
            Self::Discrete {
                width: w,
                height: h,
            } => w == width && h == height,
            Self::Stepwise {
                min_width,
                max_width,
                step_width,
                min_height,
                max_height,
                step_height,
            } => {
                on_grid(width, min_width, max_width, step_width)
                    && on_grid(height, min_height, max_height, step_height)
            }
        }
    }
}

fn on_grid(value: u32, min: u32, max: u32, step: u32) -> bool {
    if value < min || value > max {
        return false;
    }
    step == 0 || (value - min) % step == 0
}

impl From<v4l::framesize::FrameSizeEnum> for FrameSize {
    fn from(size: v4l::framesize::FrameSizeEnum) -> Self {
        match size {
            v4l::framesize::FrameSizeEnum::Discrete(d) => Self::Discrete {
                width: d.width,
                height: d.height,
            },
            v4l::framesize::FrameSizeEnum::Stepwise(s) => Self::Stepwise {
                min_width: s.min_width,
                max_width: s.max_width,
                step_width: s.step_width,
                min_height: s.min_height,
                max_height: s.max_height,
                step_height: s.step_height,
            },
        }
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
    /// Actual bytes used in the frame buffer.
    pub bytes_used: u32,
}

/// A captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame data.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

impl Frame {
    /// Whether the device delivered no payload for this frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Error type for camera operations.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// Failed to open device.
    #[error("failed to open device: {0}")]
    DeviceOpenFailed(String),
    /// A capability or format query failed.
    #[error("failed to get {what}: {msg}")]
    QueryFailed {
        /// What was being queried.
        what: &'static str,
        /// Driver error text.
        msg: String,
    },
    /// Requested format was rejected by the device.
    #[error("failed to set format {0}: {1}")]
    FormatNotSupported(Format, String),
    /// None of the preferred pixel formats has usable frame sizes.
    #[error("no appropriate sizes found for any preferred format")]
    NoSupportedFormat,
    /// Error during streaming operation.
    #[error("stream error: {0}")]
    StreamError(String),
    /// The stream has no more frames to deliver.
    #[error("stream closed")]
    StreamClosed,
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    pub(crate) fn query(what: &'static str, err: &impl fmt::Display) -> Self {
        Self::QueryFailed {
            what,
            msg: err.to_string(),
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over camera device operations.
pub trait CameraDevice {
    /// The stream type returned by `create_stream`.
    type Stream<'a>: CaptureStream
    where
        Self: 'a;

    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Current frame rate in frames per second.
    fn frame_rate(&self) -> Result<u32>;

    /// All pixel formats the device offers for capture.
    fn formats(&self) -> Result<Vec<FormatDescription>>;

    /// Frame sizes supported for `fourcc`.
    fn frame_sizes(&self, fourcc: FourCC) -> Result<Vec<FrameSize>>;

    /// Get current format.
    fn format(&self) -> Result<Format>;

    /// Set capture format. Returns the actual format set by the driver.
    fn set_format(&mut self, format: &Format) -> Result<Format>;

    /// Create a capture stream with the specified number of buffers.
    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>>;
}

/// Abstraction over capture stream operations.
pub trait CaptureStream {
    /// Number of buffers backing the stream.
    fn buffer_count(&self) -> u32;

    /// Capture the next frame from the stream.
    ///
    /// Returns [`CameraError::StreamClosed`] once no further frames will arrive.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Stop streaming and release the queued buffers.
    fn stop(&mut self) -> Result<()>;
}
