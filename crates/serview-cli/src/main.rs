mod commands;
mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serview_core::SessionConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "serview", about = "SER astronomical video inspector")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Session config (TOML); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show SER file metadata
    Info(commands::info::InfoArgs),
    /// Decode one frame to an image
    Frame(commands::frame::FrameArgs),
    /// Stack a range of frames into one image
    Stack(commands::stack::StackArgs),
    /// List per-frame capture timestamps
    Timestamps(commands::timestamps::TimestampsArgs),
    /// Print or save the default session config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    debug!(?config, "Session config");

    match &cli.command {
        Commands::Info(args) => commands::info::run(args, &config),
        Commands::Frame(args) => commands::frame::run(args, &config),
        Commands::Stack(args) => commands::stack::run(args, &config),
        Commands::Timestamps(args) => commands::timestamps::run(args, &config),
        Commands::Config(args) => commands::config::run(args),
    }
}
