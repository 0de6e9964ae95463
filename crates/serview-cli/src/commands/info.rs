use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serview_core::{Session, SessionConfig};

use crate::summary::print_file_summary;

#[derive(Args)]
pub struct InfoArgs {
    /// Input SER file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs, config: &SessionConfig) -> Result<()> {
    let session = Session::open(&args.file, config)
        .with_context(|| format!("Failed to open {}", args.file.display()))?;
    print_file_summary(&args.file, &session);
    Ok(())
}
