use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::consts::RGB_CHANNELS;
use crate::error::{Result, SerError};

/// Color/Bayer layout of the frame payloads, keyed by the SER `ColorID` code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ColorFormat {
    Mono,
    BayerRGGB,
    BayerGRBG,
    BayerGBRG,
    BayerBGGR,
    BayerCYYM,
    BayerYCMY,
    BayerYMCY,
    BayerMYYC,
    RGB,
    BGR,
}

impl ColorFormat {
    pub const ALL: [ColorFormat; 11] = [
        Self::Mono,
        Self::BayerRGGB,
        Self::BayerGRBG,
        Self::BayerGBRG,
        Self::BayerBGGR,
        Self::BayerCYYM,
        Self::BayerYCMY,
        Self::BayerYMCY,
        Self::BayerMYYC,
        Self::RGB,
        Self::BGR,
    ];

    /// Map a SER `ColorID` to a format.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Mono),
            8 => Ok(Self::BayerRGGB),
            9 => Ok(Self::BayerGRBG),
            10 => Ok(Self::BayerGBRG),
            11 => Ok(Self::BayerBGGR),
            16 => Ok(Self::BayerCYYM),
            17 => Ok(Self::BayerYCMY),
            18 => Ok(Self::BayerYMCY),
            19 => Ok(Self::BayerMYYC),
            100 => Ok(Self::RGB),
            101 => Ok(Self::BGR),
            other => Err(SerError::UnsupportedColorFormat(other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Mono => 0,
            Self::BayerRGGB => 8,
            Self::BayerGRBG => 9,
            Self::BayerGBRG => 10,
            Self::BayerBGGR => 11,
            Self::BayerCYYM => 16,
            Self::BayerYCMY => 17,
            Self::BayerYMCY => 18,
            Self::BayerMYYC => 19,
            Self::RGB => 100,
            Self::BGR => 101,
        }
    }

    /// Number of planes per pixel (3 for RGB/BGR, 1 otherwise).
    pub fn planes(self) -> usize {
        match self {
            Self::RGB | Self::BGR => 3,
            _ => 1,
        }
    }

    /// True for every mosaic layout, primary or complementary.
    pub fn needs_demosaic(self) -> bool {
        self.bayer_pattern().is_some() || self.is_cmy()
    }

    /// The primary-color 2x2 pattern, if this is an RGB Bayer layout.
    pub fn bayer_pattern(self) -> Option<BayerPattern> {
        match self {
            Self::BayerRGGB => Some(BayerPattern::RGGB),
            Self::BayerGRBG => Some(BayerPattern::GRBG),
            Self::BayerGBRG => Some(BayerPattern::GBRG),
            Self::BayerBGGR => Some(BayerPattern::BGGR),
            _ => None,
        }
    }

    /// True for the complementary (cyan/yellow/magenta) mosaic family.
    pub fn is_cmy(self) -> bool {
        matches!(
            self,
            Self::BayerCYYM | Self::BayerYCMY | Self::BayerYMCY | Self::BayerMYYC
        )
    }
}

impl std::fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mono => "MONO",
            Self::BayerRGGB => "BAYER_RGGB",
            Self::BayerGRBG => "BAYER_GRBG",
            Self::BayerGBRG => "BAYER_GBRG",
            Self::BayerBGGR => "BAYER_BGGR",
            Self::BayerCYYM => "BAYER_CYYM",
            Self::BayerYCMY => "BAYER_YCMY",
            Self::BayerYMCY => "BAYER_YMCY",
            Self::BayerMYYC => "BAYER_MYYC",
            Self::RGB => "RGB",
            Self::BGR => "BGR",
        };
        write!(f, "{name}")
    }
}

/// Which primary sits at (0,0) of the 2x2 Bayer cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum BayerPattern {
    RGGB,
    GRBG,
    GBRG,
    BGGR,
}

impl BayerPattern {
    /// Returns `(row_parity, col_parity)` of the red pixel within the 2x2 cell.
    pub fn red_position(self) -> (usize, usize) {
        match self {
            Self::RGGB => (0, 0),
            Self::GRBG => (0, 1),
            Self::GBRG => (1, 0),
            Self::BGGR => (1, 1),
        }
    }
}

/// One frame decoded to 8-bit RGB, shape = (height, width, 3).
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub index: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub pixels: Array3<u8>,
}

impl DecodedFrame {
    pub fn new(index: usize, pixels: Array3<u8>) -> Self {
        debug_assert_eq!(pixels.dim().2, RGB_CHANNELS);
        Self {
            index,
            timestamp: None,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn height(&self) -> usize {
        self.pixels.dim().0
    }

    /// RGB triple at (row, col).
    pub fn rgb(&self, row: usize, col: usize) -> [u8; 3] {
        [
            self.pixels[[row, col, 0]],
            self.pixels[[row, col, 1]],
            self.pixels[[row, col, 2]],
        ]
    }

    /// Approximate heap footprint of the pixel buffer.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }
}
