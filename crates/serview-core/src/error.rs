use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid SER file: {0}")]
    InvalidFormat(String),

    #[error("Unsupported color format code: {0}")]
    UnsupportedColorFormat(i32),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfBounds { index: i64, total: usize },

    #[error("File truncated: expected {expected} bytes, {available} available")]
    TruncatedFile { expected: u64, available: u64 },

    #[error("Image error on {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Empty frame range {start}..{end}")]
    EmptyRange { start: usize, end: usize },

    #[error("Invalid frame selection: {0}")]
    InvalidSelection(String),

    #[error("No frames passed selection ({scored} scored)")]
    NoFramesSelected { scored: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl SerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn out_of_bounds(index: impl TryInto<i64>, total: usize) -> Self {
        Self::FrameIndexOutOfBounds {
            index: index.try_into().unwrap_or(i64::MAX),
            total,
        }
    }
}

pub type Result<T> = std::result::Result<T, SerError>;
