#![allow(dead_code)]

use std::io::Write;

use serview_core::frame::ColorFormat;
use serview_core::io::ser::Endianness;
use serview_core::io::ser_writer::SerHeaderSpec;
use serview_core::{Session, SessionConfig};

/// 2024-01-01T00:00:00Z as Windows FILETIME ticks.
pub const TICKS_2024: i64 = 133_485_408_000_000_000;

/// In-memory SER file builder.
pub struct SerBuilder {
    header: SerHeaderSpec,
    frames: Vec<Vec<u8>>,
    trailer: Option<Vec<i64>>,
}

impl SerBuilder {
    pub fn new(format: ColorFormat, width: u32, height: u32, depth: u32) -> Self {
        Self {
            header: SerHeaderSpec::new(format, width, height, depth, 0),
            frames: Vec::new(),
            trailer: None,
        }
    }

    pub fn mono8(width: u32, height: u32) -> Self {
        Self::new(ColorFormat::Mono, width, height, 8)
    }

    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.header.endianness = endianness;
        self
    }

    pub fn instrument(mut self, name: &str) -> Self {
        self.header.instrument = name.to_string();
        self
    }

    pub fn lu_id(mut self, id: i32) -> Self {
        self.header.lu_id = id;
        self
    }

    pub fn capture_time(mut self, ticks: i64) -> Self {
        self.header.date_time = ticks;
        self.header.date_time_utc = ticks;
        self
    }

    pub fn frame(mut self, bytes: Vec<u8>) -> Self {
        self.frames.push(bytes);
        self
    }

    /// Mono 8-bit frames where every sample of frame `i` equals `values[i]`.
    pub fn flat_frames(mut self, values: &[u8]) -> Self {
        let size = self.header.frame_byte_size();
        for &v in values {
            self.frames.push(vec![v; size]);
        }
        self
    }

    pub fn timestamps(mut self, ticks: Vec<i64>) -> Self {
        self.trailer = Some(ticks);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = self.header.clone();
        header.frame_count = self.frames.len() as u32;
        let mut buf = header.to_bytes();
        for frame in &self.frames {
            buf.extend_from_slice(frame);
        }
        if let Some(ticks) = &self.trailer {
            for &t in ticks {
                let bytes = match header.endianness {
                    Endianness::Little => t.to_le_bytes(),
                    Endianness::Big => t.to_be_bytes(),
                };
                buf.extend_from_slice(&bytes);
            }
        }
        buf
    }

    pub fn session(&self) -> Session {
        self.session_with(&SessionConfig::default())
    }

    pub fn session_with(&self, config: &SessionConfig) -> Session {
        Session::from_bytes(self.build(), config).expect("valid SER data")
    }
}

/// Encode 16-bit samples in the given byte order.
pub fn u16_samples(values: &[u16], endianness: Endianness) -> Vec<u8> {
    values
        .iter()
        .flat_map(|&v| match endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        })
        .collect()
}

/// Write a SER buffer to a temporary file and return the temp file handle.
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_test_ser(data: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("create temp file");
    f.write_all(data).expect("write SER data");
    f.flush().expect("flush");
    f
}
