use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::consts::{SER_HEADER_SIZE, SER_MAGIC, SER_TEXT_FIELD_LEN};
use crate::error::{Result, SerError};
use crate::frame::ColorFormat;
use crate::io::ser::Endianness;

/// Header values for a new SER file.
#[derive(Clone, Debug)]
pub struct SerHeaderSpec {
    pub lu_id: i32,
    pub color_format: ColorFormat,
    pub endianness: Endianness,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: i64,
    pub date_time_utc: i64,
}

impl SerHeaderSpec {
    /// Little-endian header with empty text fields and zero capture times.
    pub fn new(
        color_format: ColorFormat,
        width: u32,
        height: u32,
        pixel_depth: u32,
        frame_count: u32,
    ) -> Self {
        Self {
            lu_id: 0,
            color_format,
            endianness: Endianness::Little,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    pub fn frame_byte_size(&self) -> usize {
        let bytes_per_plane = if self.pixel_depth <= 8 { 1 } else { 2 };
        self.width as usize * self.height as usize * bytes_per_plane * self.color_format.planes()
    }

    /// Encode the 178-byte header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SER_HEADER_SIZE);
        buf.extend_from_slice(SER_MAGIC);
        let int = |v: i32| match self.endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        };
        buf.extend_from_slice(&int(self.lu_id));
        buf.extend_from_slice(&int(self.color_format.code()));
        buf.extend_from_slice(&int(self.endianness.flag()));
        buf.extend_from_slice(&int(self.width as i32));
        buf.extend_from_slice(&int(self.height as i32));
        buf.extend_from_slice(&int(self.pixel_depth as i32));
        buf.extend_from_slice(&int(self.frame_count as i32));
        push_fixed_string(&mut buf, &self.observer);
        push_fixed_string(&mut buf, &self.instrument);
        push_fixed_string(&mut buf, &self.telescope);
        buf.extend_from_slice(&self.encode_i64(self.date_time));
        buf.extend_from_slice(&self.encode_i64(self.date_time_utc));

        debug_assert_eq!(buf.len(), SER_HEADER_SIZE);
        buf
    }

    fn encode_i64(&self, v: i64) -> [u8; 8] {
        match self.endianness {
            Endianness::Little => v.to_le_bytes(),
            Endianness::Big => v.to_be_bytes(),
        }
    }
}

fn push_fixed_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(SER_TEXT_FIELD_LEN);
    buf.extend_from_slice(&bytes[..len]);
    buf.resize(buf.len() + SER_TEXT_FIELD_LEN - len, 0);
}

/// Writes a new SER file at the raw byte level.
pub struct SerWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    header: SerHeaderSpec,
    frames_written: u32,
}

impl SerWriter {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeaderSpec) -> Result<Self> {
        let file = File::create(path).map_err(|e| SerError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(&header.to_bytes())
            .map_err(|e| SerError::io(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            header: header.clone(),
            frames_written: 0,
        })
    }

    /// Write a single raw frame (bytes must match the header's frame size).
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        let expected = self.header.frame_byte_size();
        if data.len() != expected {
            return Err(SerError::InvalidFormat(format!(
                "frame has {} bytes, header requires {expected}",
                data.len()
            )));
        }
        self.writer
            .write_all(data)
            .map_err(|e| SerError::io(&self.path, e))?;
        self.frames_written += 1;
        Ok(())
    }

    /// Write the timestamp trailer (one tick value per frame).
    pub fn write_timestamps(&mut self, ticks: &[i64]) -> Result<()> {
        for &t in ticks {
            let bytes = self.header.encode_i64(t);
            self.writer
                .write_all(&bytes)
                .map_err(|e| SerError::io(&self.path, e))?;
        }
        Ok(())
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Flush and finalize the file.
    pub fn finalize(mut self) -> Result<()> {
        self.writer.flush().map_err(|e| SerError::io(&self.path, e))
    }
}
