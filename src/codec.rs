//! Frame decoding and JPEG re-encoding.
//!
//! Compressed payloads go through the `image` crate; packed YUYV frames are
//! converted to RGB here using the ITU-R BT.601 coefficients.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageFormat, RgbImage};

use crate::traits::{Format, FourCC};

/// Default JPEG quality, matching common encoder defaults.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Error type for frame codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame carried no payload.
    #[error("empty frame")]
    EmptyFrame,
    /// No decoder is available for the pixel format.
    #[error("unsupported pixel format {0}")]
    UnsupportedFormat(FourCC),
    /// The payload is shorter than the format requires.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the format.
        expected: usize,
        /// Bytes received.
        actual: usize,
    },
    /// The image is larger than a JPEG frame header can describe.
    #[error("{width}x{height} exceeds the JPEG limit of 65535x65535")]
    TooLarge {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
    /// The image library rejected the payload.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A frame decoded into pixels.
#[derive(Debug)]
pub struct DecodedFrame {
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Short name of the payload encoding, e.g. `jpeg` or `yuyv`.
    pub format_name: &'static str,
}

/// Decode a captured payload according to the negotiated format.
///
/// Packed YUYV is converted directly. Everything else is sniffed by magic
/// bytes, since some drivers label MJPEG streams loosely; MJPG and JPEG
/// payloads without a recognisable header are still handed to the JPEG
/// decoder.
pub fn decode_frame(data: &[u8], format: &Format) -> Result<DecodedFrame, CodecError> {
    if data.is_empty() {
        return Err(CodecError::EmptyFrame);
    }

    if format.fourcc == FourCC::YUYV {
        let image = yuyv_to_rgb(data, format.width, format.height, format.stride)?;
        return Ok(DecodedFrame {
            image: DynamicImage::ImageRgb8(image),
            format_name: "yuyv",
        });
    }

    let image_format = match image::guess_format(data) {
        Ok(image_format) => image_format,
        Err(_) if matches!(format.fourcc, FourCC::MJPG | FourCC::JPEG) => ImageFormat::Jpeg,
        Err(_) => return Err(CodecError::UnsupportedFormat(format.fourcc)),
    };

    let image = image::load_from_memory_with_format(data, image_format)?;
    Ok(DecodedFrame {
        image,
        format_name: format_name(image_format),
    })
}

const fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        _ => "image",
    }
}

/// Encode pixels as a baseline JPEG.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    let (width, height) = (image.width(), image.height());
    if u16::try_from(width).is_err() || u16::try_from(height).is_err() {
        return Err(CodecError::TooLarge { width, height });
    }

    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Convert a packed YUYV 4:2:2 buffer to RGB.
///
/// Each `[Y0 U Y1 V]` group yields two pixels sharing the chroma pair. Rows
/// start every `stride` bytes; a stride below `width * 2` means tightly packed,
/// and a buffer of exactly `width * 2 * height` bytes is always read as tight.
pub fn yuyv_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> Result<RgbImage, CodecError> {
    let (width_px, height_px) = (width as usize, height as usize);
    let row_bytes = width_px.saturating_mul(2);
    let tight_len = row_bytes.checked_mul(height_px);
    let stride = if tight_len == Some(data.len()) {
        row_bytes
    } else {
        (stride as usize).max(row_bytes)
    };

    // The last row needs no trailing padding.
    let expected = stride
        .checked_mul(height_px.saturating_sub(1))
        .and_then(|rows| rows.checked_add(row_bytes))
        .unwrap_or(usize::MAX);
    if row_bytes == 0 || height_px == 0 || data.len() < expected {
        return Err(CodecError::Truncated {
            expected,
            actual: data.len(),
        });
    }

    let mut rgb = Vec::with_capacity(width_px * height_px * 3);
    for row in data.chunks(stride).take(height_px) {
        let pixels = row.get(..row_bytes).unwrap_or_default();
        for group in pixels.chunks_exact(4) {
            if let [y0, u, y1, v] = *group {
                let (r, g, b) = yuv_to_rgb(y0, u, v);
                rgb.extend_from_slice(&[r, g, b]);
                let (r, g, b) = yuv_to_rgb(y1, u, v);
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or(CodecError::Truncated {
        expected,
        actual: data.len(),
    })
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula with values clamped to 0-255.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}
