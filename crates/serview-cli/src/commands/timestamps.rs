use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serview_core::{Session, SessionConfig};

#[derive(Args)]
pub struct TimestampsArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Print at most this many frames
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn run(args: &TimestampsArgs, config: &SessionConfig) -> Result<()> {
    let session = Session::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;

    if !session.metadata().has_timestamps {
        println!("{} has no timestamp trailer", args.file.display());
        return Ok(());
    }

    let count = args
        .limit
        .map_or(session.frame_count(), |n| n.min(session.frame_count()));
    let mut previous = None;
    for index in 0..count {
        let stamp = session.timestamp_of(index as i64)?;
        match stamp {
            Some(t) => {
                let delta = previous
                    .map(|p| {
                        let micros = t.signed_duration_since(p).num_microseconds().unwrap_or(0);
                        format!("  {:+.3}s", micros as f64 / 1e6)
                    })
                    .unwrap_or_default();
                println!("{:>6}  {}{}", index, t.format("%Y-%m-%d %H:%M:%S%.6f"), delta);
                previous = Some(t);
            }
            None => println!("{:>6}  -", index),
        }
    }
    Ok(())
}
