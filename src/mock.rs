//! Mock device implementation for testing without hardware.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::codec::{encode_jpeg, yuyv_to_rgb};
use crate::traits::{
    CameraDevice, CameraError, CaptureStream, DeviceCapabilities, Format, FormatDescription,
    FourCC, Frame, FrameMetadata, FrameSize, Result,
};

/// One scripted item delivered by a [`MockStream`].
#[derive(Debug, Clone)]
pub enum MockFrame {
    /// A generated frame in the current device format.
    Pattern(TestPattern),
    /// A frame with no payload.
    Empty,
    /// A frame with exactly these bytes.
    Bytes(Vec<u8>),
    /// A failed dequeue.
    Error,
}

/// Mock device for testing without hardware.
pub struct MockDevice {
    capabilities: DeviceCapabilities,
    format: Format,
    frame_rate: u32,
    formats: Vec<FormatDescription>,
    sizes: HashMap<FourCC, Vec<FrameSize>>,
    failing_size_queries: Vec<FourCC>,
    script: VecDeque<MockFrame>,
    fail_stop: bool,
    fail_stream: bool,
    frame_count: u32,
    /// Buffer count requested by the last `create_stream`.
    pub requested_buffers: Option<u32>,
    /// Formats passed to `set_format`, in order.
    pub applied_formats: Vec<Format>,
    /// Whether `stop` was called on a stream.
    pub stopped: bool,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a mock offering 640x480 and 1280x720 YUYV, streaming color bars forever.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(640, 480, FourCC::YUYV),
            frame_rate: 30,
            formats: Vec::new(),
            sizes: HashMap::new(),
            failing_size_queries: Vec::new(),
            script: VecDeque::new(),
            fail_stop: false,
            fail_stream: false,
            frame_count: 0,
            requested_buffers: None,
            applied_formats: Vec::new(),
            stopped: false,
        }
        .with_sizes(
            FourCC::YUYV,
            vec![
                FrameSize::Discrete {
                    width: 640,
                    height: 480,
                },
                FrameSize::Discrete {
                    width: 1280,
                    height: 720,
                },
            ],
        )
    }

    /// Set the format for this mock device.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Offer `fourcc` with the given frame sizes.
    #[must_use]
    pub fn with_sizes(mut self, fourcc: FourCC, sizes: Vec<FrameSize>) -> Self {
        if !self.formats.iter().any(|desc| desc.fourcc == fourcc) {
            #[allow(clippy::cast_possible_truncation)]
            let index = self.formats.len() as u32;
            self.formats.push(FormatDescription {
                index,
                fourcc,
                description: fourcc.to_string(),
                compressed: fourcc.bytes_per_pixel().is_none(),
            });
        }
        self.sizes.insert(fourcc, sizes);
        self
    }

    /// Offer `fourcc` but fail every frame size query for it.
    #[must_use]
    pub fn with_failing_sizes(mut self, fourcc: FourCC) -> Self {
        self = self.with_sizes(fourcc, Vec::new());
        self.failing_size_queries.push(fourcc);
        self
    }

    /// Remove every offered format.
    #[must_use]
    pub fn without_formats(mut self) -> Self {
        self.formats.clear();
        self.sizes.clear();
        self
    }

    /// Deliver these frames, then report the stream closed.
    #[must_use]
    pub fn with_script(mut self, script: Vec<MockFrame>) -> Self {
        self.script = script.into();
        self
    }

    /// Make `stop` fail.
    #[must_use]
    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Make `create_stream` fail.
    #[must_use]
    pub fn with_failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }
}

impl CameraDevice for MockDevice {
    type Stream<'a> = MockStream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn frame_rate(&self) -> Result<u32> {
        Ok(self.frame_rate)
    }

    fn formats(&self) -> Result<Vec<FormatDescription>> {
        Ok(self.formats.clone())
    }

    fn frame_sizes(&self, fourcc: FourCC) -> Result<Vec<FrameSize>> {
        if self.failing_size_queries.contains(&fourcc) {
            return Err(CameraError::query("frame sizes", &"inappropriate ioctl"));
        }
        Ok(self.sizes.get(&fourcc).cloned().unwrap_or_default())
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        self.applied_formats.push(format.clone());
        self.format = Format::new(format.width, format.height, format.fourcc);
        Ok(self.format.clone())
    }

    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>> {
        if self.fail_stream {
            return Err(CameraError::StreamError("device busy".to_owned()));
        }
        self.requested_buffers = Some(buffer_count);
        let scripted = !self.script.is_empty();
        Ok(MockStream {
            device: self,
            pattern: TestPattern::ColorBars,
            scripted,
            buffer_count,
        })
    }
}

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// SMPTE color bars pattern.
    ColorBars,
    /// Horizontal gradient from dark to light.
    Gradient,
    /// Solid color with specified Y, U, V values.
    Solid(u8, u8, u8),
}

/// Mock capture stream for testing.
pub struct MockStream<'a> {
    device: &'a mut MockDevice,
    pattern: TestPattern,
    scripted: bool,
    buffer_count: u32,
}

impl MockStream<'_> {
    /// Set the test pattern for unscripted frame generation.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    fn frame(&mut self, data: Vec<u8>) -> Frame {
        let seq = self.device.frame_count;
        self.device.frame_count += 1;

        #[allow(clippy::cast_possible_truncation)]
        let bytes_used = data.len() as u32;
        Frame {
            data,
            metadata: FrameMetadata {
                sequence: seq,
                timestamp: Duration::from_millis(u64::from(seq) * 33), // ~30fps
                bytes_used,
            },
        }
    }
}

impl CaptureStream for MockStream<'_> {
    fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let item = if self.scripted {
            self.device
                .script
                .pop_front()
                .ok_or(CameraError::StreamClosed)?
        } else {
            MockFrame::Pattern(self.pattern)
        };

        let data = match item {
            MockFrame::Pattern(pattern) => render_pattern(&self.device.format, pattern),
            MockFrame::Empty => Vec::new(),
            MockFrame::Bytes(bytes) => bytes,
            MockFrame::Error => {
                self.device.frame_count += 1;
                return Err(CameraError::StreamError("VIDIOC_DQBUF: EIO".to_owned()));
            }
        };
        Ok(self.frame(data))
    }

    fn stop(&mut self) -> Result<()> {
        self.device.stopped = true;
        if self.device.fail_stop {
            return Err(CameraError::StreamError("VIDIOC_STREAMOFF: EBUSY".to_owned()));
        }
        Ok(())
    }
}

/// Render a pattern in the device's current pixel format.
fn render_pattern(format: &Format, pattern: TestPattern) -> Vec<u8> {
    let yuyv = generate_test_frame(format, pattern);
    match format.fourcc {
        FourCC::MJPG | FourCC::JPEG => yuyv_to_rgb(&yuyv, format.width, format.height, 0)
            .ok()
            .and_then(|rgb| encode_jpeg(&image::DynamicImage::ImageRgb8(rgb), 90).ok())
            .unwrap_or_default(),
        _ => yuyv,
    }
}

/// Encode a small color bar JPEG.
pub fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    render_pattern(
        &Format::new(width, height, FourCC::MJPG),
        TestPattern::ColorBars,
    )
}

/// Generate YUYV test frame data based on pattern.
pub fn generate_test_frame(format: &Format, pattern: TestPattern) -> Vec<u8> {
    let size = (format.width * format.height * 2) as usize; // YUYV = 2 bytes/pixel
    let mut data = vec![0u8; size];

    match pattern {
        TestPattern::ColorBars => {
            generate_color_bars(&mut data, format.width, format.height);
        }
        TestPattern::Gradient => {
            generate_gradient(&mut data, format.width, format.height);
        }
        TestPattern::Solid(y, u, v) => {
            generate_solid(&mut data, y, u, v);
        }
    }

    data
}

/// Generate YUYV color bars pattern.
fn generate_color_bars(data: &mut [u8], width: u32, height: u32) {
    // White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
    let bars: [(u8, u8, u8); 8] = [
        (235, 128, 128),
        (210, 16, 146),
        (170, 166, 16),
        (145, 54, 34),
        (106, 202, 222),
        (81, 90, 240),
        (41, 240, 110),
        (16, 128, 128),
    ];

    let bar_width = (width / 8).max(1);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let bar_idx = (x / bar_width).min(7) as usize;
            let (y_val, u_val, v_val) = bars[bar_idx];

            let offset = ((y * width + x) * 2) as usize;
            if offset + 3 < data.len() {
                data[offset] = y_val;
                data[offset + 1] = u_val;
                data[offset + 2] = y_val;
                data[offset + 3] = v_val;
            }
        }
    }
}

/// Generate YUYV horizontal gradient pattern.
fn generate_gradient(data: &mut [u8], width: u32, height: u32) {
    for y in 0..height {
        for x in (0..width).step_by(2) {
            #[allow(clippy::cast_possible_truncation)]
            let y_val = ((x * 255) / width) as u8;
            let offset = ((y * width + x) * 2) as usize;

            if offset + 3 < data.len() {
                data[offset] = y_val;
                data[offset + 1] = 128;
                data[offset + 2] = y_val;
                data[offset + 3] = 128;
            }
        }
    }
}

/// Generate solid color YUYV frame.
fn generate_solid(data: &mut [u8], y: u8, u: u8, v: u8) {
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&[y, u, y, v]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_creation() {
        let device = MockDevice::new();
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
        assert_eq!(device.frame_rate().expect("frame_rate"), 30);
    }

    #[test]
    fn test_mock_device_formats() {
        let device = MockDevice::new().with_sizes(FourCC::MJPG, Vec::new());
        let formats = device.formats().expect("formats should succeed");
        let codes: Vec<FourCC> = formats.iter().map(|d| d.fourcc).collect();
        assert_eq!(codes, vec![FourCC::YUYV, FourCC::MJPG]);
        assert!(formats[1].compressed);
        assert_eq!(device.frame_sizes(FourCC::YUYV).expect("sizes").len(), 2);
    }

    #[test]
    fn test_mock_stream_unscripted_never_closes() {
        let mut device = MockDevice::new();
        let mut stream = device.create_stream(4).expect("create_stream should succeed");
        assert_eq!(stream.buffer_count(), 4);

        let frame1 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame1.metadata.sequence, 0);
        assert_eq!(frame1.data.len(), 640 * 480 * 2);

        let frame2 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame2.metadata.sequence, 1);
    }

    #[test]
    fn test_mock_stream_script_then_closed() {
        let mut device = MockDevice::new().with_script(vec![
            MockFrame::Empty,
            MockFrame::Bytes(vec![1, 2, 3]),
            MockFrame::Error,
        ]);
        let mut stream = device.create_stream(2).expect("create_stream should succeed");

        assert!(stream.next_frame().expect("empty frame").is_empty());
        assert_eq!(stream.next_frame().expect("bytes frame").data, vec![1, 2, 3]);
        assert!(matches!(
            stream.next_frame(),
            Err(CameraError::StreamError(_))
        ));
        assert!(matches!(stream.next_frame(), Err(CameraError::StreamClosed)));
    }

    #[test]
    fn test_mjpeg_pattern_is_jpeg() {
        let jpeg = encode_test_jpeg(32, 16);
        assert_eq!(jpeg.get(..2), Some(&[0xFF, 0xD8][..]));
    }

    #[test]
    fn test_solid_pattern() {
        let format = Format::new(64, 64, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Solid(128, 64, 192));
        assert_eq!(&data[..4], &[128, 64, 128, 192]);
    }
}
