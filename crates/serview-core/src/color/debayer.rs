use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

use crate::consts::{PARALLEL_PIXEL_THRESHOLD, RGB_CHANNELS};
use crate::frame::BayerPattern;

/// Debayering (demosaicing) algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DebayerMethod {
    /// Simple bilinear interpolation, fast and good enough for preview.
    #[default]
    Bilinear,
    /// Malvar-He-Cutler gradient-corrected, higher quality at moderate cost.
    MalvarHeCutler,
}

impl std::fmt::Display for DebayerMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bilinear => write!(f, "Bilinear"),
            Self::MalvarHeCutler => write!(f, "Malvar-He-Cutler"),
        }
    }
}

/// Debayer a primary-color mosaic into an (h, w, 3) RGB8 buffer.
///
/// `raw` holds samples already scaled to the 0..=255 range.
pub fn debayer(raw: &Array2<f32>, pattern: BayerPattern, method: DebayerMethod) -> Array3<u8> {
    let (h, w) = raw.dim();
    let mut out = Array3::<u8>::zeros((h, w, RGB_CHANNELS));
    let (r_row, r_col) = pattern.red_position();

    for_each_row(&mut out, |row, mut line| {
        let ri = row as isize;
        let is_red_row = (row % 2) == r_row;
        for col in 0..w {
            let ci = col as isize;
            let is_red_col = (col % 2) == r_col;
            let site = match (is_red_row, is_red_col) {
                (true, true) => Site::Red,
                (true, false) => Site::GreenOnRedRow,
                (false, true) => Site::GreenOnBlueRow,
                (false, false) => Site::Blue,
            };
            let rgb = match method {
                DebayerMethod::Bilinear => bilinear_at(raw, ri, ci, site),
                DebayerMethod::MalvarHeCutler => mhc_at(raw, ri, ci, site),
            };
            for (c, v) in rgb.into_iter().enumerate() {
                line[[col, c]] = to_u8(v);
            }
        }
    });

    out
}

/// Replicate a single plane into R, G and B.
pub fn replicate_gray(raw: &Array2<f32>) -> Array3<u8> {
    let (h, w) = raw.dim();
    let mut out = Array3::<u8>::zeros((h, w, RGB_CHANNELS));
    for_each_row(&mut out, |row, mut line| {
        for col in 0..w {
            let v = to_u8(raw[[row, col]]);
            line[[col, 0]] = v;
            line[[col, 1]] = v;
            line[[col, 2]] = v;
        }
    });
    out
}

/// Round and clamp a 0..=255 sample to `u8`.
#[inline]
pub(crate) fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Run `f(row, line)` for every (w, 3) row of `out`, row-parallel for large frames.
pub(crate) fn for_each_row<F>(out: &mut Array3<u8>, f: F)
where
    F: Fn(usize, ArrayViewMut2<u8>) + Sync + Send,
{
    let (h, w, _) = out.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, line)| f(row, line));
    } else {
        for (row, line) in out.axis_iter_mut(Axis(0)).enumerate() {
            f(row, line);
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Native color of a mosaic site.
#[derive(Clone, Copy)]
enum Site {
    Red,
    GreenOnRedRow,
    GreenOnBlueRow,
    Blue,
}

/// Clamped indexing into the raw Bayer mosaic.
#[inline]
fn px(raw: &Array2<f32>, row: isize, col: isize) -> f32 {
    let (h, w) = raw.dim();
    let r = row.clamp(0, h as isize - 1) as usize;
    let c = col.clamp(0, w as isize - 1) as usize;
    raw[[r, c]]
}

// ---------------------------------------------------------------------------
// Bilinear demosaicing
// ---------------------------------------------------------------------------

fn bilinear_at(raw: &Array2<f32>, r: isize, c: isize, site: Site) -> [f32; 3] {
    let own = px(raw, r, c);
    match site {
        Site::Red => [own, avg_cross(raw, r, c), avg_diagonal(raw, r, c)],
        Site::GreenOnRedRow => [avg_horizontal(raw, r, c), own, avg_vertical(raw, r, c)],
        Site::GreenOnBlueRow => [avg_vertical(raw, r, c), own, avg_horizontal(raw, r, c)],
        Site::Blue => [avg_diagonal(raw, r, c), avg_cross(raw, r, c), own],
    }
}

/// Average of 4 cross (cardinal) neighbours.
#[inline]
fn avg_cross(raw: &Array2<f32>, r: isize, c: isize) -> f32 {
    (px(raw, r - 1, c) + px(raw, r + 1, c) + px(raw, r, c - 1) + px(raw, r, c + 1)) * 0.25
}

/// Average of 4 diagonal neighbours.
#[inline]
fn avg_diagonal(raw: &Array2<f32>, r: isize, c: isize) -> f32 {
    (px(raw, r - 1, c - 1)
        + px(raw, r - 1, c + 1)
        + px(raw, r + 1, c - 1)
        + px(raw, r + 1, c + 1))
        * 0.25
}

/// Average of left and right neighbours.
#[inline]
fn avg_horizontal(raw: &Array2<f32>, r: isize, c: isize) -> f32 {
    (px(raw, r, c - 1) + px(raw, r, c + 1)) * 0.5
}

/// Average of top and bottom neighbours.
#[inline]
fn avg_vertical(raw: &Array2<f32>, r: isize, c: isize) -> f32 {
    (px(raw, r - 1, c) + px(raw, r + 1, c)) * 0.5
}

// ---------------------------------------------------------------------------
// Malvar-He-Cutler (MHC) demosaicing
// ---------------------------------------------------------------------------
//
// Reference: "High-quality linear interpolation for demosaicing of
// Bayer-patterned color images", Malvar, He, Cutler (2004).
//
// All kernels are scaled by 2 from the paper values and divided by 16.

/// Green at a red or blue location.
const MHC_G_AT_RB: [[i32; 5]; 5] = [
    [0, 0, -2, 0, 0],
    [0, 0, 4, 0, 0],
    [-2, 4, 8, 4, -2],
    [0, 0, 4, 0, 0],
    [0, 0, -2, 0, 0],
];

/// Red at green in a red row / Blue at green in a blue row.
const MHC_RB_AT_G_SAME_ROW: [[i32; 5]; 5] = [
    [0, 0, 1, 0, 0],
    [0, -2, 0, -2, 0],
    [-2, 8, 10, 8, -2],
    [0, -2, 0, -2, 0],
    [0, 0, 1, 0, 0],
];

/// Red at green in a blue row / Blue at green in a red row.
const MHC_RB_AT_G_DIFF_ROW: [[i32; 5]; 5] = [
    [0, 0, -2, 0, 0],
    [0, -2, 8, -2, 0],
    [1, 0, 10, 0, 1],
    [0, -2, 8, -2, 0],
    [0, 0, -2, 0, 0],
];

/// Red at blue / Blue at red (diagonal).
const MHC_RB_AT_BR: [[i32; 5]; 5] = [
    [0, 0, -3, 0, 0],
    [0, 4, 0, 4, 0],
    [-3, 0, 12, 0, -3],
    [0, 4, 0, 4, 0],
    [0, 0, -3, 0, 0],
];

const MHC_DIVISOR: f32 = 16.0;

/// Apply a 5x5 kernel centred at (r,c), divide and clamp to the sample range.
#[inline]
fn apply_kernel(raw: &Array2<f32>, r: isize, c: isize, kernel: &[[i32; 5]; 5]) -> f32 {
    let mut sum = 0.0_f32;
    for (kr, krow) in kernel.iter().enumerate() {
        for (kc, &kval) in krow.iter().enumerate() {
            if kval != 0 {
                sum += kval as f32 * px(raw, r + kr as isize - 2, c + kc as isize - 2);
            }
        }
    }
    (sum / MHC_DIVISOR).clamp(0.0, 255.0)
}

fn mhc_at(raw: &Array2<f32>, r: isize, c: isize, site: Site) -> [f32; 3] {
    let own = px(raw, r, c);
    match site {
        Site::Red => [
            own,
            apply_kernel(raw, r, c, &MHC_G_AT_RB),
            apply_kernel(raw, r, c, &MHC_RB_AT_BR),
        ],
        // Red neighbours are left/right.
        Site::GreenOnRedRow => [
            apply_kernel(raw, r, c, &MHC_RB_AT_G_SAME_ROW),
            own,
            apply_kernel(raw, r, c, &MHC_RB_AT_G_DIFF_ROW),
        ],
        // Blue neighbours are left/right.
        Site::GreenOnBlueRow => [
            apply_kernel(raw, r, c, &MHC_RB_AT_G_DIFF_ROW),
            own,
            apply_kernel(raw, r, c, &MHC_RB_AT_G_SAME_ROW),
        ],
        Site::Blue => [
            apply_kernel(raw, r, c, &MHC_RB_AT_BR),
            apply_kernel(raw, r, c, &MHC_G_AT_RB),
            own,
        ],
    }
}
