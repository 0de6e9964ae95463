use ndarray::Array2;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::frame::DecodedFrame;

/// Rec. 601 luma of an RGB8 frame, on the 0..=255 scale.
pub fn luminance(frame: &DecodedFrame) -> Array2<f32> {
    let (h, w, _) = frame.pixels.dim();
    let px = &frame.pixels;
    Array2::from_shape_fn((h, w), |(row, col)| {
        LUMINANCE_R * f32::from(px[[row, col, 0]])
            + LUMINANCE_G * f32::from(px[[row, col, 1]])
            + LUMINANCE_B * f32::from(px[[row, col, 2]])
    })
}

/// Variance of the 4-neighbour Laplacian over the interior of `data`.
///
/// Kernel:
///   0  1  0
///   1 -4  1
///   0  1  0
///
/// Images smaller than 3x3 score zero.
pub fn laplacian_variance_array(data: &Array2<f32>) -> f64 {
    let (h, w) = data.dim();
    if h < 3 || w < 3 {
        return 0.0;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let count = ((h - 2) * (w - 2)) as f64;

    for row in 1..h - 1 {
        for col in 1..w - 1 {
            let lap = -4.0 * f64::from(data[[row, col]])
                + f64::from(data[[row - 1, col]])
                + f64::from(data[[row + 1, col]])
                + f64::from(data[[row, col - 1]])
                + f64::from(data[[row, col + 1]]);
            sum += lap;
            sum_sq += lap * lap;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

/// Laplacian variance of the frame's luminance.
pub fn sharpness(frame: &DecodedFrame) -> f64 {
    laplacian_variance_array(&luminance(frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn checkerboard(size: usize, low: u8, high: u8) -> DecodedFrame {
        let pixels = Array3::from_shape_fn((size, size, 3), |(r, c, _)| {
            if (r + c) % 2 == 0 {
                high
            } else {
                low
            }
        });
        DecodedFrame::new(0, pixels)
    }

    #[test]
    fn flat_frame_scores_zero() {
        let frame = DecodedFrame::new(0, Array3::from_elem((6, 6, 3), 90));
        assert!(sharpness(&frame).abs() < 1e-9);
    }

    #[test]
    fn tiny_frame_scores_zero() {
        let frame = checkerboard(2, 0, 255);
        assert_eq!(sharpness(&frame), 0.0);
    }

    #[test]
    fn contrast_raises_score() {
        let strong = sharpness(&checkerboard(8, 0, 200));
        let weak = sharpness(&checkerboard(8, 50, 150));
        assert!(weak > 0.0);
        assert!(strong > weak * 3.0, "strong {strong}, weak {weak}");
    }

    #[test]
    fn gray_luminance_is_identity() {
        let frame = DecodedFrame::new(0, Array3::from_elem((1, 1, 3), 120));
        assert!((luminance(&frame)[[0, 0]] - 120.0).abs() < 1e-3);
    }
}
