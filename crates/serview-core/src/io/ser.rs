use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{SER_HEADER_SIZE, SER_MAGIC, SER_TEXT_FIELD_LEN, TIMESTAMP_SIZE};
use crate::error::{Result, SerError};
use crate::frame::ColorFormat;

/// Byte order of every integer after the endianness flag, including pixel samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl Endianness {
    /// Interpret the header's `LittleEndian` field.
    ///
    /// Writers in the wild use 0 for little-endian and 1 for big-endian, the
    /// inverse of the field name. That reading is authoritative here. The
    /// value 1 is recognised in either byte order.
    pub fn from_flag(raw: [u8; 4]) -> Result<Self> {
        let le = LittleEndian::read_i32(&raw);
        let be = BigEndian::read_i32(&raw);
        match (le, be) {
            (0, _) => Ok(Self::Little),
            (1, _) | (_, 1) => Ok(Self::Big),
            _ => Err(SerError::InvalidFormat(format!(
                "unrecognised endianness flag {le}"
            ))),
        }
    }

    pub fn flag(self) -> i32 {
        match self {
            Self::Little => 0,
            Self::Big => 1,
        }
    }

    #[inline]
    pub fn read_u16(self, pair: [u8; 2]) -> u16 {
        match self {
            Self::Little => u16::from_le_bytes(pair),
            Self::Big => u16::from_be_bytes(pair),
        }
    }

    #[inline]
    pub fn read_i64(self, bytes: &[u8]) -> i64 {
        match self {
            Self::Little => LittleEndian::read_i64(bytes),
            Self::Big => BigEndian::read_i64(bytes),
        }
    }
}

/// Immutable description of an opened SER file.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMetadata {
    /// The 14-byte file identifier as text.
    pub file_id: String,
    /// Camera / source id (`LuID`).
    pub lu_id: i32,
    pub color_format: ColorFormat,
    /// The endianness flag exactly as stored (little-endian read).
    pub endian_flag: i32,
    pub endianness: Endianness,
    pub width: u32,
    pub height: u32,
    /// Bits per plane sample (1..=16).
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    /// Local capture time in 100 ns ticks.
    pub date_time: i64,
    /// UTC capture time in 100 ns ticks.
    pub date_time_utc: i64,
    pub file_size: u64,
    /// Whether the per-frame timestamp trailer is present.
    pub has_timestamps: bool,
}

impl FileMetadata {
    /// Bytes per pixel plane (1 for depth <= 8, 2 for 9..=16).
    pub fn bytes_per_plane(&self) -> usize {
        if self.pixel_depth <= 8 { 1 } else { 2 }
    }

    pub fn planes(&self) -> usize {
        self.color_format.planes()
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.bytes_per_plane() * self.planes()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count as usize
    }

    /// Offset of the first byte of `index`'s payload.
    pub fn frame_offset(&self, index: usize) -> u64 {
        SER_HEADER_SIZE as u64 + index as u64 * self.frame_byte_size() as u64
    }

    /// Offset of the optional timestamp trailer.
    pub fn trailer_offset(&self) -> u64 {
        self.frame_offset(self.frame_count())
    }

    pub fn observer(&self) -> Option<&str> {
        non_empty(&self.observer)
    }

    pub fn instrument(&self) -> Option<&str> {
        non_empty(&self.instrument)
    }

    pub fn telescope(&self) -> Option<&str> {
        non_empty(&self.telescope)
    }
}

/// Parse the 178-byte header. `file_size` is the full size of the source and
/// decides whether the file is truncated and whether a trailer is present.
pub fn parse_header(buf: &[u8], file_size: u64) -> Result<FileMetadata> {
    if buf.len() < SER_HEADER_SIZE {
        return Err(SerError::InvalidFormat(format!(
            "file too small for SER header: {} bytes",
            buf.len()
        )));
    }
    if &buf[0..14] != SER_MAGIC {
        return Err(SerError::InvalidFormat("missing LUCAM-RECORDER magic".into()));
    }

    let mut flag = [0u8; 4];
    flag.copy_from_slice(&buf[22..26]);
    let endianness = Endianness::from_flag(flag)?;
    let fields = match endianness {
        Endianness::Little => read_fields::<LittleEndian>(buf)?,
        Endianness::Big => read_fields::<BigEndian>(buf)?,
    };

    let color_format = ColorFormat::from_code(fields.color_id)?;

    if fields.width <= 0 || fields.height <= 0 {
        return Err(SerError::InvalidFormat(format!(
            "invalid image dimensions {}x{}",
            fields.width, fields.height
        )));
    }
    if !(1..=16).contains(&fields.pixel_depth) {
        return Err(SerError::InvalidFormat(format!(
            "unsupported pixel depth {}",
            fields.pixel_depth
        )));
    }
    if fields.frame_count <= 0 {
        return Err(SerError::InvalidFormat(format!(
            "invalid frame count {}",
            fields.frame_count
        )));
    }

    let metadata = FileMetadata {
        file_id: String::from_utf8_lossy(SER_MAGIC).into_owned(),
        lu_id: fields.lu_id,
        color_format,
        endian_flag: LittleEndian::read_i32(&flag),
        endianness,
        width: fields.width as u32,
        height: fields.height as u32,
        pixel_depth: fields.pixel_depth as u32,
        frame_count: fields.frame_count as u32,
        observer: read_fixed_string(&buf[42..42 + SER_TEXT_FIELD_LEN]),
        instrument: read_fixed_string(&buf[82..82 + SER_TEXT_FIELD_LEN]),
        telescope: read_fixed_string(&buf[122..122 + SER_TEXT_FIELD_LEN]),
        date_time: fields.date_time,
        date_time_utc: fields.date_time_utc,
        file_size,
        has_timestamps: false,
    };

    let data_end = checked_data_end(&metadata).ok_or_else(|| {
        SerError::InvalidFormat(format!(
            "frame data size overflows: {}x{}x{} frames",
            metadata.width, metadata.height, metadata.frame_count
        ))
    })?;
    if file_size < data_end {
        return Err(SerError::TruncatedFile {
            expected: data_end,
            available: file_size,
        });
    }
    let remainder = file_size - data_end;
    let trailer_size = metadata.frame_count as u64 * TIMESTAMP_SIZE as u64;

    Ok(FileMetadata {
        has_timestamps: remainder >= trailer_size,
        ..metadata
    })
}

fn checked_data_end(metadata: &FileMetadata) -> Option<u64> {
    (metadata.width as u64)
        .checked_mul(metadata.height as u64)?
        .checked_mul((metadata.bytes_per_plane() * metadata.planes()) as u64)?
        .checked_mul(metadata.frame_count as u64)?
        .checked_add(SER_HEADER_SIZE as u64)
}

struct HeaderFields {
    lu_id: i32,
    color_id: i32,
    width: i32,
    height: i32,
    pixel_depth: i32,
    frame_count: i32,
    date_time: i64,
    date_time_utc: i64,
}

fn read_fields<B: ByteOrder>(buf: &[u8]) -> Result<HeaderFields> {
    let truncated = |_| SerError::InvalidFormat("short SER header".into());

    let mut cursor = Cursor::new(&buf[14..42]);
    let lu_id = cursor.read_i32::<B>().map_err(truncated)?;
    let color_id = cursor.read_i32::<B>().map_err(truncated)?;
    let _flag = cursor.read_i32::<B>().map_err(truncated)?;
    let width = cursor.read_i32::<B>().map_err(truncated)?;
    let height = cursor.read_i32::<B>().map_err(truncated)?;
    let pixel_depth = cursor.read_i32::<B>().map_err(truncated)?;
    let frame_count = cursor.read_i32::<B>().map_err(truncated)?;

    let mut cursor = Cursor::new(&buf[162..SER_HEADER_SIZE]);
    let date_time = cursor.read_i64::<B>().map_err(truncated)?;
    let date_time_utc = cursor.read_i64::<B>().map_err(truncated)?;

    Ok(HeaderFields {
        lu_id,
        color_id,
        width,
        height,
        pixel_depth,
        frame_count,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// Raw payload of one frame, borrowed from the reader.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    pub index: usize,
    pub bytes: &'a [u8],
}

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl std::ops::Deref for Backing {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// Read-only SER source, memory-mapped from disk or held in memory.
pub struct SerReader {
    data: Backing,
    path: Option<PathBuf>,
    pub metadata: FileMetadata,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SerError::io(path, e))?;
        let file_size = file.metadata().map_err(|e| SerError::io(path, e))?.len();
        if file_size < SER_HEADER_SIZE as u64 {
            return Err(SerError::InvalidFormat(format!(
                "file too small for SER header: {file_size} bytes"
            )));
        }

        // The map is read-only and this process never writes the file.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SerError::io(path, e))?;
        let metadata = parse_header(&mmap[..SER_HEADER_SIZE], file_size)?;

        info!(
            path = %path.display(),
            frames = metadata.frame_count,
            width = metadata.width,
            height = metadata.height,
            depth = metadata.pixel_depth,
            format = %metadata.color_format,
            timestamps = metadata.has_timestamps,
            "Opened SER file"
        );

        Ok(Self {
            data: Backing::Mapped(mmap),
            path: Some(path.to_path_buf()),
            metadata,
        })
    }

    /// Parse an in-memory SER image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let metadata = parse_header(&bytes, bytes.len() as u64)?;
        debug!(frames = metadata.frame_count, "Parsed in-memory SER data");
        Ok(Self {
            data: Backing::Owned(bytes),
            path: None,
            metadata,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn frame_count(&self) -> usize {
        self.metadata.frame_count()
    }

    /// Validate a signed frame index coming from a caller.
    pub fn check_index(&self, index: i64) -> Result<usize> {
        let total = self.frame_count();
        usize::try_from(index)
            .ok()
            .filter(|&i| i < total)
            .ok_or(SerError::FrameIndexOutOfBounds { index, total })
    }

    /// Get the raw bytes for a single frame (zero-copy).
    pub fn frame_raw(&self, index: usize) -> Result<RawFrame<'_>> {
        let total = self.frame_count();
        if index >= total {
            return Err(SerError::out_of_bounds(index, total));
        }
        let size = self.metadata.frame_byte_size() as u64;
        let offset = self.metadata.frame_offset(index);
        let bytes = self.slice(offset, size)?;
        Ok(RawFrame { index, bytes })
    }

    /// Raw tick value stored in the trailer for `index`, if the trailer exists.
    pub fn timestamp_ticks(&self, index: usize) -> Result<Option<i64>> {
        let total = self.frame_count();
        if index >= total {
            return Err(SerError::out_of_bounds(index, total));
        }
        if !self.metadata.has_timestamps {
            return Ok(None);
        }
        let offset = self.metadata.trailer_offset() + (index * TIMESTAMP_SIZE) as u64;
        let bytes = self.slice(offset, TIMESTAMP_SIZE as u64)?;
        Ok(Some(self.metadata.endianness.read_i64(bytes)))
    }

    fn slice(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let available = self.data.len() as u64;
        let end = offset + len;
        if end > available {
            return Err(SerError::TruncatedFile {
                expected: end,
                available,
            });
        }
        Ok(&self.data[offset as usize..end as usize])
    }
}

impl std::fmt::Debug for SerReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerReader")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish()
    }
}
