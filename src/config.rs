//! Command-line flags and the resolved capture configuration.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};

use crate::codec::DEFAULT_JPEG_QUALITY;

/// Default device node.
pub const DEFAULT_DEVICE: &str = "/dev/video0";
/// Default number of mmap buffers, enough to keep a webcam streaming.
pub const DEFAULT_BUFFER_COUNT: u32 = 4;

/// What gets written for each captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// The bytes exactly as delivered by the device.
    #[default]
    Raw,
    /// The frame after decoding and JPEG re-encoding.
    Jpeg,
}

/// Capture a few frames from a V4L2 device and save them to disk.
#[derive(Parser, Debug)]
#[command(name = "frame-grab", version, about, disable_help_flag = true)]
pub struct Args {
    /// Device name (path), or an index N meaning /dev/videoN.
    #[arg(short = 'd', long = "device", default_value = DEFAULT_DEVICE)]
    pub device: String,

    /// Number of frames to capture.
    #[arg(short = 'c', long = "count", default_value_t = 3)]
    pub count: u32,

    /// Picture width.
    #[arg(short = 'w', long = "width", default_value_t = 640)]
    pub width: u32,

    /// Picture height.
    #[arg(short = 'h', long = "height", default_value_t = 480)]
    pub height: u32,

    /// Number of mmap buffers to request.
    #[arg(short = 'b', long = "buffers", default_value_t = DEFAULT_BUFFER_COUNT)]
    pub buffers: u32,

    /// Directory receiving capture_<n>.jpg files.
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Write the re-encoded JPEG instead of the raw frame bytes.
    #[arg(long = "reencode")]
    pub reencode: bool,

    /// JPEG quality used when re-encoding.
    #[arg(
        short = 'q',
        long = "quality",
        default_value_t = DEFAULT_JPEG_QUALITY,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub quality: u8,

    /// Default log filter; RUST_LOG takes precedence.
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,

    /// Print help.
    #[arg(long = "help", action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// Settings for one capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device node to open.
    pub device: PathBuf,
    /// Maximum number of frames to consume from the stream.
    pub frame_count: u32,
    /// Requested width.
    pub width: u32,
    /// Requested height.
    pub height: u32,
    /// Buffers to queue on the stream.
    pub buffer_count: u32,
    /// Where output files go.
    pub output_dir: PathBuf,
    /// What each output file contains.
    pub output: OutputMode,
    /// JPEG quality for re-encoding.
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            frame_count: 3,
            width: 640,
            height: 480,
            buffer_count: DEFAULT_BUFFER_COUNT,
            output_dir: PathBuf::from("."),
            output: OutputMode::Raw,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CaptureConfig {
    /// Output path for the frame with 1-based `index`.
    #[must_use]
    pub fn file_path(&self, index: u32) -> PathBuf {
        self.output_dir.join(file_name(index))
    }
}

/// File name for the frame with 1-based `index`.
#[must_use]
pub fn file_name(index: u32) -> String {
    format!("capture_{index}.jpg")
}

/// Resolve a device argument; a bare number selects `/dev/videoN`.
#[must_use]
pub fn device_path(arg: &str) -> PathBuf {
    if arg.parse::<u32>().is_ok() {
        PathBuf::from(format!("/dev/video{arg}"))
    } else {
        Path::new(arg).to_path_buf()
    }
}

impl From<Args> for CaptureConfig {
    fn from(args: Args) -> Self {
        Self {
            device: device_path(&args.device),
            frame_count: args.count,
            width: args.width,
            height: args.height,
            buffer_count: args.buffers,
            output_dir: args.output_dir,
            output: if args.reencode {
                OutputMode::Jpeg
            } else {
                OutputMode::Raw
            },
            jpeg_quality: args.quality,
        }
    }
}
