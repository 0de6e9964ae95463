use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serview_core::io::image_io::save_frame;
use serview_core::{Session, SessionConfig};

#[derive(Args)]
pub struct FrameArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Zero-based frame index
    #[arg(allow_negative_numbers = true)]
    pub index: i64,

    /// Output image (.png or .tif)
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,
}

pub fn run(args: &FrameArgs, config: &SessionConfig) -> Result<()> {
    let session = Session::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let frame = session.decode_frame(args.index)?;

    save_frame(&frame, &args.output)?;
    match frame.timestamp {
        Some(t) => println!(
            "Frame {} ({}x{}, {}) saved to {}",
            frame.index,
            frame.width(),
            frame.height(),
            t.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
            args.output.display()
        ),
        None => println!(
            "Frame {} ({}x{}) saved to {}",
            frame.index,
            frame.width(),
            frame.height(),
            args.output.display()
        ),
    }
    Ok(())
}
