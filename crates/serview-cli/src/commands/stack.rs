use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serview_core::io::image_io::save_rgb;
use serview_core::stack::{FrameSelection, StackJob, StackMethod, StackOutcome};
use serview_core::{Session, SessionConfig};

#[derive(Clone, Copy, ValueEnum)]
pub enum StackMethodArg {
    Average,
    Median,
    Sum,
}

impl From<StackMethodArg> for StackMethod {
    fn from(arg: StackMethodArg) -> Self {
        match arg {
            StackMethodArg::Average => StackMethod::Average,
            StackMethodArg::Median => StackMethod::Median,
            StackMethodArg::Sum => StackMethod::Sum,
        }
    }
}

#[derive(Args)]
pub struct StackArgs {
    /// Input SER file
    pub file: PathBuf,

    /// Stacking method
    #[arg(long, value_enum, default_value = "average")]
    pub method: StackMethodArg,

    /// First frame to include
    #[arg(long, default_value = "0")]
    pub start: usize,

    /// One past the last frame to include (defaults to the frame count)
    #[arg(long)]
    pub end: Option<usize>,

    /// Keep only the sharpest percentage of frames (lucky imaging)
    #[arg(long)]
    pub best_percent: Option<f32>,

    /// Reject frames with a sharpness score below this
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Stretch the result between its 0.1 and 99.9 percentiles
    #[arg(long)]
    pub auto_stretch: bool,

    /// Output image (.png or .tif)
    #[arg(short, long, default_value = "stacked.png")]
    pub output: PathBuf,
}

pub fn run(args: &StackArgs, config: &SessionConfig) -> Result<()> {
    let session = Session::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    let end = args.end.unwrap_or(session.frame_count());
    let method = StackMethod::from(args.method);

    let mut request = session.stack_request(args.start..end, method);
    if args.best_percent.is_some() || args.min_score.is_some() {
        request = request.with_selection(FrameSelection {
            best_percent: args.best_percent,
            min_score: args.min_score,
        });
    }
    if args.auto_stretch {
        request = request.with_auto_stretch(true);
    }

    println!(
        "Stacking frames {}..{} ({}, {})",
        args.start, end, method, request.selection
    );
    let mut job = session.start_stack_with(request)?;

    let pb = ProgressBar::new(job.progress().total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:>14} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let outcome = loop {
        if let Some(result) = job.try_result() {
            break result?;
        }
        update_bar(&pb, &job);
        thread::sleep(Duration::from_millis(50));
    };
    update_bar(&pb, &job);
    pb.finish();

    match outcome {
        StackOutcome::Completed(result) => {
            save_rgb(&result.pixels, &args.output)?;
            println!(
                "Combined {} frames{}, saved to {}",
                result.frames_combined,
                if result.stretched { " (stretched)" } else { "" },
                args.output.display()
            );
            Ok(())
        }
        StackOutcome::Cancelled { processed, total } => {
            bail!("Stacking cancelled after {processed} of {total} frames")
        }
    }
}

fn update_bar(pb: &ProgressBar, job: &StackJob) {
    let progress = job.progress();
    if let Some(stage) = progress.stage {
        pb.set_message(stage.to_string());
    }
    pb.set_length(progress.total as u64);
    pb.set_position(progress.done as u64);
}
