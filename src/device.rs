//! V4L2 device implementation using the v4l crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use v4l::buffer::Type;
use v4l::format::FieldOrder;
use v4l::io::mmap::Stream;
use v4l::io::traits::{CaptureStream as V4lCaptureStream, Stream as _};
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FormatDescription,
    FourCC, Frame, FrameMetadata, FrameSize, Result,
};

/// V4L2 device implementation wrapping the v4l crate.
pub struct V4L2Device {
    device: Device,
    path: PathBuf,
    capabilities: DeviceCapabilities,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    pub fn open(index: u32) -> Result<Self> {
        Self::with_path(format!("/dev/video{index}"))
    }

    /// Open a V4L2 device node by path.
    pub fn with_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tracing::debug!(path = %path.display(), "opening capture device");

        let device = Device::with_path(&path)
            .map_err(|err| CameraError::DeviceOpenFailed(format!("{}: {err}", path.display())))?;

        let caps = device
            .query_caps()
            .map_err(|err| CameraError::DeviceOpenFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        Ok(Self {
            device,
            path,
            capabilities,
        })
    }

    /// Path of the opened device node.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn to_format(fmt: &v4l::Format) -> Format {
    Format {
        width: fmt.width,
        height: fmt.height,
        fourcc: FourCC::from(fmt.fourcc),
        stride: fmt.stride,
        size: fmt.size,
    }
}

impl CameraDevice for V4L2Device {
    type Stream<'a> = V4L2Stream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn frame_rate(&self) -> Result<u32> {
        let params = self
            .device
            .params()
            .map_err(|err| CameraError::query("framerate", &err))?;

        // The driver reports time per frame; the rate is its inverse.
        let interval = params.interval;
        if interval.numerator == 0 {
            return Ok(0);
        }
        Ok(interval.denominator / interval.numerator)
    }

    fn formats(&self) -> Result<Vec<FormatDescription>> {
        let descriptions = self
            .device
            .enum_formats()
            .map_err(|err| CameraError::query("format descriptions", &err))?;

        Ok(descriptions
            .into_iter()
            .map(|desc| FormatDescription {
                index: desc.index,
                fourcc: FourCC::from(desc.fourcc),
                compressed: desc
                    .flags
                    .contains(v4l::format::description::Flags::COMPRESSED),
                description: desc.description,
            })
            .collect())
    }

    fn frame_sizes(&self, fourcc: FourCC) -> Result<Vec<FrameSize>> {
        let sizes = self
            .device
            .enum_framesizes(fourcc.into())
            .map_err(|err| CameraError::query("frame sizes", &err))?;

        Ok(sizes.into_iter().map(|fs| FrameSize::from(fs.size)).collect())
    }

    fn format(&self) -> Result<Format> {
        let fmt = self
            .device
            .format()
            .map_err(|err| CameraError::query("format", &err))?;

        Ok(to_format(&fmt))
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| CameraError::query("format", &err))?;

        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();
        fmt.field_order = FieldOrder::Progressive;

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| CameraError::FormatNotSupported(format.clone(), err.to_string()))?;

        Ok(to_format(&fmt))
    }

    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>> {
        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        Ok(V4L2Stream {
            stream,
            buffer_count,
        })
    }
}

/// V4L2 capture stream wrapping mmap-based streaming.
///
/// Buffers are queued and streaming is switched on by the first
/// [`CaptureStream::next_frame`] call.
pub struct V4L2Stream<'a> {
    stream: Stream<'a>,
    buffer_count: u32,
}

impl CaptureStream for V4L2Stream<'_> {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let (buf, meta) = V4lCaptureStream::next(&mut self.stream)
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        // Safe conversions: V4L2 timestamps are always non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = meta.timestamp.sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

        // Only the bytes the driver filled belong to the frame.
        let used = usize::try_from(meta.bytesused).map_or(buf.len(), |n| n.min(buf.len()));
        let data = buf.get(..used).unwrap_or_default().to_vec();

        Ok(Frame {
            data,
            metadata: FrameMetadata {
                sequence: meta.sequence,
                timestamp: Duration::new(secs, nanos),
                bytes_used: meta.bytesused,
            },
        })
    }

    fn stop(&mut self) -> Result<()> {
        self.stream
            .stop()
            .map_err(|err| CameraError::StreamError(err.to_string()))
    }
}
