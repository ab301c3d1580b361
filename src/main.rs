//! Frame-grab binary: capture N frames from a V4L2 device into capture_<n>.jpg files.

use clap::Parser;
use frame_grab::{Args, CaptureConfig, RunError, V4L2Device};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let config = CaptureConfig::from(args);
    match run(&config) {
        Ok(()) => println!("Done."),
        Err(err @ RunError::Stop(_)) => {
            println!("{err}");
            std::process::exit(err.exit_code());
        }
        Err(err) => {
            tracing::error!("{err}");
            std::process::exit(err.exit_code());
        }
    }
}

fn run(config: &CaptureConfig) -> Result<(), RunError> {
    let mut device = V4L2Device::with_path(&config.device)?;
    let summary = frame_grab::run(&mut device, config)?;
    tracing::debug!(?summary, "run summary");
    Ok(())
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
