//! The bounded frame consumption loop.
//!
//! Each frame is decoded and re-encoded before anything is written, so a file
//! only appears for frames that survive the codec. Every per-frame failure is
//! logged and the loop moves on to the next frame.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use crate::codec::{decode_frame, encode_jpeg};
use crate::config::{CaptureConfig, OutputMode};
use crate::traits::{CameraError, CaptureStream, Format, Frame};

/// Counters for one run of [`capture_frames`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Stream items consumed, including failed reads.
    pub frames_received: u32,
    /// Stream reads that returned an error.
    pub read_failures: u32,
    /// Frames with a zero-length payload.
    pub empty_frames: u32,
    /// Frames the decoder rejected.
    pub decode_failures: u32,
    /// Frames the JPEG encoder rejected.
    pub encode_failures: u32,
    /// Files that could not be created or written.
    pub write_failures: u32,
    /// Files written, in capture order.
    pub saved: Vec<PathBuf>,
}

/// Consume up to `config.frame_count` frames from `stream`, writing one file per good frame.
pub fn capture_frames<S: CaptureStream>(
    stream: &mut S,
    config: &CaptureConfig,
    format: &Format,
) -> CaptureSummary {
    let mut summary = CaptureSummary::default();

    for index in 1..=config.frame_count {
        let frame = match stream.next_frame() {
            Ok(frame) => frame,
            Err(CameraError::StreamClosed) => {
                tracing::info!(captured = summary.frames_received, "stream closed");
                break;
            }
            Err(err) => {
                summary.frames_received += 1;
                summary.read_failures += 1;
                tracing::warn!(index, %err, "failed to read frame");
                continue;
            }
        };
        summary.frames_received += 1;

        process_frame(index, &frame, config, format, &mut summary);
    }

    summary
}

fn process_frame(
    index: u32,
    frame: &Frame,
    config: &CaptureConfig,
    format: &Format,
    summary: &mut CaptureSummary,
) {
    if frame.is_empty() {
        summary.empty_frames += 1;
        tracing::warn!(index, "received frame size 0");
        return;
    }

    tracing::info!(
        index,
        sequence = frame.metadata.sequence,
        "captured {} bytes",
        frame.data.len()
    );

    let decoded = match decode_frame(&frame.data, format) {
        Ok(decoded) => decoded,
        Err(err) => {
            summary.decode_failures += 1;
            tracing::warn!(index, %err, "failed to decode frame");
            return;
        }
    };
    tracing::info!(index, format = decoded.format_name, "decoded image format");

    let encoded = match encode_jpeg(&decoded.image, config.jpeg_quality) {
        Ok(encoded) => encoded,
        Err(err) => {
            summary.encode_failures += 1;
            tracing::warn!(index, %err, "failed to encode jpeg");
            return;
        }
    };

    let contents = match config.output {
        OutputMode::Raw => frame.data.as_slice(),
        OutputMode::Jpeg => encoded.as_slice(),
    };

    let path = config.file_path(index);
    match write_file(&path, contents) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "saved file");
            summary.saved.push(path);
        }
        Err(err) => {
            summary.write_failures += 1;
            tracing::warn!(path = %path.display(), %err, "failed to write file");
        }
    }
}

fn write_file(path: &std::path::Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.flush()
}
