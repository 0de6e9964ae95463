use ndarray::Array3;

use crate::consts::{STRETCH_EPSILON, STRETCH_HIGH_PERCENTILE, STRETCH_LOW_PERCENTILE};

/// Percentile-based contrast stretch of unquantized stack values to RGB8.
///
/// The 0.1th percentile maps to 0 and the 99.9th to 255; values outside are
/// clipped and the result truncated. When the two percentiles coincide the
/// values are only rounded and clamped.
pub(super) fn auto_stretch(values: &Array3<f64>) -> Array3<u8> {
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_unstable_by(f64::total_cmp);

    let black = percentile(&sorted, STRETCH_LOW_PERCENTILE);
    let white = percentile(&sorted, STRETCH_HIGH_PERCENTILE);
    let span = white - black;

    if span < STRETCH_EPSILON {
        return values.mapv(|v| (v + 0.5).floor().clamp(0.0, 255.0) as u8);
    }
    values.mapv(|v| (((v - black) / span).clamp(0.0, 1.0) * 255.0) as u8)
}

/// Linearly interpolated percentile `p` (0..=100) of ascending `sorted`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return 0.0;
    };
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if hi >= sorted.len() {
        return last;
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
