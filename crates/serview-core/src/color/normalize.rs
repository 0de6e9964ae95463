use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::color::cmy::{demosaic_cmy, CfaRemapTable};
use crate::color::debayer::{debayer, for_each_row, replicate_gray, to_u8, DebayerMethod};
use crate::consts::RGB_CHANNELS;
use crate::error::{Result, SerError};
use crate::frame::{ColorFormat, DecodedFrame};
use crate::io::ser::{Endianness, FileMetadata, RawFrame};

/// User-facing demosaic preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DemosaicChoice {
    #[default]
    Bilinear,
    MalvarHeCutler,
    /// Show mosaics as grayscale without interpolation.
    Grayscale,
}

/// How mosaic frames are turned into RGB. Resolved once per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemosaicStrategy {
    Full(DebayerMethod),
    GrayscaleFallback,
}

impl DemosaicStrategy {
    pub fn resolve(choice: DemosaicChoice) -> Self {
        match choice {
            DemosaicChoice::Bilinear => Self::Full(DebayerMethod::Bilinear),
            DemosaicChoice::MalvarHeCutler => Self::Full(DebayerMethod::MalvarHeCutler),
            DemosaicChoice::Grayscale => Self::GrayscaleFallback,
        }
    }
}

impl Default for DemosaicStrategy {
    fn default() -> Self {
        Self::resolve(DemosaicChoice::default())
    }
}

impl std::fmt::Display for DemosaicStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full(method) => write!(f, "{method}"),
            Self::GrayscaleFallback => write!(f, "Grayscale fallback"),
        }
    }
}

/// Converts raw frame payloads into RGB8 frames.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    strategy: DemosaicStrategy,
    remap: CfaRemapTable,
}

impl Normalizer {
    pub fn new(strategy: DemosaicStrategy, remap: CfaRemapTable) -> Self {
        Self { strategy, remap }
    }

    pub fn strategy(&self) -> DemosaicStrategy {
        self.strategy
    }

    /// The layout frames of this file are decoded as, after camera remapping.
    pub fn effective_format(&self, metadata: &FileMetadata) -> ColorFormat {
        self.remap.resolve(metadata)
    }

    pub fn normalize(&self, raw: RawFrame<'_>, metadata: &FileMetadata) -> Result<DecodedFrame> {
        let format = self.effective_format(metadata);
        let pixels = normalize_pixels(raw.bytes, metadata, format, self.strategy)?;
        Ok(DecodedFrame::new(raw.index, pixels))
    }
}

/// Decode one frame's bytes into an (h, w, 3) RGB8 buffer.
///
/// `format` is the layout to decode as, normally `metadata.color_format` or
/// its remapped CYYM-family variant.
pub fn normalize_pixels(
    bytes: &[u8],
    metadata: &FileMetadata,
    format: ColorFormat,
    strategy: DemosaicStrategy,
) -> Result<Array3<u8>> {
    let h = metadata.height as usize;
    let w = metadata.width as usize;
    let planes = format.planes();
    let expected = h * w * planes * metadata.bytes_per_plane();
    if bytes.len() < expected {
        return Err(SerError::TruncatedFile {
            expected: expected as u64,
            available: bytes.len() as u64,
        });
    }

    let samples = SampleDecoder::new(metadata);

    if planes == RGB_CHANNELS {
        let (r_idx, b_idx) = match format {
            ColorFormat::BGR => (2, 0),
            _ => (0, 2),
        };
        let mut out = Array3::<u8>::zeros((h, w, RGB_CHANNELS));
        for_each_row(&mut out, |row, mut line| {
            for col in 0..w {
                let base = (row * w + col) * RGB_CHANNELS;
                line[[col, 0]] = to_u8(samples.get(bytes, base + r_idx));
                line[[col, 1]] = to_u8(samples.get(bytes, base + 1));
                line[[col, 2]] = to_u8(samples.get(bytes, base + b_idx));
            }
        });
        return Ok(out);
    }

    let plane = Array2::from_shape_fn((h, w), |(row, col)| samples.get(bytes, row * w + col));

    let pixels = match (strategy, format.bayer_pattern()) {
        (DemosaicStrategy::Full(method), Some(pattern)) => debayer(&plane, pattern, method),
        (DemosaicStrategy::Full(_), None) if format.is_cmy() => {
            demosaic_cmy(&plane, format).unwrap_or_else(|| replicate_gray(&plane))
        }
        _ => replicate_gray(&plane),
    };
    Ok(pixels)
}

/// Reads sample `i` from a payload and scales it to 0..=255.
struct SampleDecoder {
    wide: bool,
    endianness: Endianness,
    scale: f32,
    max: u16,
}

impl SampleDecoder {
    fn new(metadata: &FileMetadata) -> Self {
        let wide = metadata.bytes_per_plane() == 2;
        let max = if wide {
            ((1u32 << metadata.pixel_depth) - 1) as u16
        } else {
            u8::MAX as u16
        };
        Self {
            wide,
            endianness: metadata.endianness,
            scale: if wide { 255.0 / max as f32 } else { 1.0 },
            max,
        }
    }

    #[inline]
    fn get(&self, bytes: &[u8], i: usize) -> f32 {
        if self.wide {
            let v = self.endianness.read_u16([bytes[2 * i], bytes[2 * i + 1]]);
            v.min(self.max) as f32 * self.scale
        } else {
            bytes[i] as f32
        }
    }
}
