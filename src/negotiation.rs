//! Pixel format and frame size negotiation.
//!
//! The device is asked for everything it offers, the first preferred pixel
//! format with at least one frame size wins, and the requested resolution is
//! used when that format supports it. The chosen format is applied before any
//! stream is created.

use crate::traits::{
    CameraDevice, CameraError, Format, FormatDescription, FourCC, FrameSize, Result,
};

/// Pixel formats to try, most preferred first.
pub const PREFERRED_FORMATS: [FourCC; 4] =
    [FourCC::MPEG, FourCC::MJPG, FourCC::JPEG, FourCC::YUYV];

/// The outcome of [`select_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSelection {
    /// Width to configure.
    pub width: u32,
    /// Height to configure.
    pub height: u32,
    /// Whether the requested size was available.
    pub requested_found: bool,
}

/// Result of a full negotiation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    /// The pixel format chosen.
    pub description: FormatDescription,
    /// The size chosen.
    pub size: SizeSelection,
    /// The format the driver actually applied.
    pub format: Format,
}

/// Look up the description for `fourcc`.
#[must_use]
pub fn find_description(
    descriptions: &[FormatDescription],
    fourcc: FourCC,
) -> Option<&FormatDescription> {
    descriptions.iter().find(|desc| desc.fourcc == fourcc)
}

/// Pick the first preferred format that reports at least one frame size.
pub fn select_format<D: CameraDevice>(device: &D) -> Result<(FormatDescription, Vec<FrameSize>)> {
    let descriptions = device.formats()?;
    tracing::debug!(
        formats = ?descriptions.iter().map(|d| d.fourcc.to_string()).collect::<Vec<_>>(),
        "device formats"
    );

    for fourcc in PREFERRED_FORMATS {
        let Some(desc) = find_description(&descriptions, fourcc) else {
            continue;
        };
        let sizes = match device.frame_sizes(fourcc) {
            Ok(sizes) => sizes,
            Err(err) => {
                tracing::debug!(%fourcc, %err, "skipping format");
                continue;
            }
        };
        if !sizes.is_empty() {
            return Ok((desc.clone(), sizes));
        }
    }

    Err(CameraError::NoSupportedFormat)
}

/// Choose the requested size when offered, otherwise the first one listed.
///
/// Returns `None` only when `sizes` is empty.
#[must_use]
pub fn select_size(sizes: &[FrameSize], width: u32, height: u32) -> Option<SizeSelection> {
    if sizes.iter().any(|size| size.supports(width, height)) {
        return Some(SizeSelection {
            width,
            height,
            requested_found: true,
        });
    }

    let first = sizes.first()?;
    Some(SizeSelection {
        width: first.min_width(),
        height: first.min_height(),
        requested_found: false,
    })
}

/// Select, apply, and read back a capture format.
pub fn negotiate<D: CameraDevice>(device: &mut D, width: u32, height: u32) -> Result<Negotiated> {
    let (description, sizes) = select_format(device)?;
    let size = select_size(&sizes, width, height).ok_or(CameraError::NoSupportedFormat)?;

    if size.requested_found {
        tracing::info!(width, height, fourcc = %description.fourcc, "found preferred size");
    } else {
        tracing::warn!(
            "specified size {width}x{height} not supported, setting to {}x{}",
            size.width,
            size.height
        );
    }

    let requested = Format::new(size.width, size.height, description.fourcc);
    device.set_format(&requested)?;

    let format = device.format()?;
    tracing::info!(%format, "pixel format set");

    Ok(Negotiated {
        description,
        size,
        format,
    })
}
