use std::sync::Arc;

use ndarray::Array3;

use crate::color::debayer::for_each_row;
use crate::consts::RGB_CHANNELS;
use crate::frame::DecodedFrame;

/// Per-sample median over `frames`, which must be non-empty and share one shape.
///
/// Uses `select_nth_unstable` for O(n) selection without a full sort. Rows
/// are computed independently, in parallel for large frames.
pub(super) fn median_stack(frames: &[Arc<DecodedFrame>]) -> Array3<u8> {
    let (h, w, _) = frames[0].pixels.dim();
    let n = frames.len();
    let mut out = Array3::<u8>::zeros((h, w, RGB_CHANNELS));

    for_each_row(&mut out, |row, mut line| {
        let mut values = vec![0u8; n];
        for col in 0..w {
            for c in 0..RGB_CHANNELS {
                for (slot, frame) in values.iter_mut().zip(frames) {
                    *slot = frame.pixels[[row, col, c]];
                }
                line[[col, c]] = compute_median(&mut values);
            }
        }
    });

    out
}

/// Median of `values`; an even count yields the mean of the two middle
/// values rounded half up.
fn compute_median(values: &mut [u8]) -> u8 {
    let n = values.len();
    let mid = n / 2;
    if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        *values.select_nth_unstable(mid).1
    } else {
        let upper = *values.select_nth_unstable(mid).1;
        let lower = *values[..mid].select_nth_unstable(mid - 1).1;
        ((u16::from(lower) + u16::from(upper) + 1) / 2) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_count_picks_middle() {
        assert_eq!(compute_median(&mut [9, 1, 5]), 5);
    }

    #[test]
    fn even_count_rounds_half_up() {
        assert_eq!(compute_median(&mut [10, 11]), 11);
        assert_eq!(compute_median(&mut [40, 0, 10, 30]), 20);
        assert_eq!(compute_median(&mut [254, 255]), 255);
    }
}
