//! Capture run orchestration: setup, frame loop, teardown.

use crate::capture::{capture_frames, CaptureSummary};
use crate::config::CaptureConfig;
use crate::negotiation::negotiate;
use crate::traits::{CameraDevice, CameraError, CaptureStream};

/// Why a capture run failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Device setup failed before any frame was read.
    #[error(transparent)]
    Setup(#[from] CameraError),
    /// The stream could not be stopped after capturing.
    #[error("failed to stop stream: {0}")]
    Stop(#[source] CameraError),
}

impl RunError {
    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Setup(_) | Self::Stop(_) => 1,
        }
    }
}

/// Negotiate a format on `device`, capture `config.frame_count` frames, and stop the stream.
pub fn run<D: CameraDevice>(
    device: &mut D,
    config: &CaptureConfig,
) -> Result<CaptureSummary, RunError> {
    let caps = device.capabilities();
    tracing::info!(
        card = %caps.card,
        driver = %caps.driver,
        bus = %caps.bus_info,
        "opened device"
    );
    if !caps.can_capture || !caps.can_stream {
        tracing::warn!(
            can_capture = caps.can_capture,
            can_stream = caps.can_stream,
            "device may not support streaming capture"
        );
    }

    let fps = device.frame_rate()?;
    let negotiated = negotiate(device, config.width, config.height)?;

    let mut stream = device.create_stream(config.buffer_count)?;
    tracing::info!(
        "Capturing {} frames (buffers: {}, {fps} fps)...",
        config.frame_count,
        stream.buffer_count()
    );

    let summary = capture_frames(&mut stream, config, &negotiated.format);
    tracing::info!(
        received = summary.frames_received,
        saved = summary.saved.len(),
        "capture finished"
    );

    stream.stop().map_err(RunError::Stop)?;
    Ok(summary)
}
