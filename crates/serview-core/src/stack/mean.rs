use ndarray::{Array3, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Running per-sample `u64` sum over a sequence of RGB8 frames.
///
/// `u64` cannot overflow for any realistic frame count (it would take more
/// than 7e16 frames at full scale).
pub(super) struct Accumulator {
    sum: Array3<u64>,
    count: u64,
}

impl Accumulator {
    pub(super) fn new(dim: (usize, usize, usize)) -> Self {
        Self {
            sum: Array3::zeros(dim),
            count: 0,
        }
    }

    pub(super) fn add(&mut self, pixels: &Array3<u8>) {
        let zip = Zip::from(&mut self.sum).and(pixels);
        if pixels.len() >= PARALLEL_PIXEL_THRESHOLD {
            zip.par_for_each(|s, &v| *s += u64::from(v));
        } else {
            zip.for_each(|s, &v| *s += u64::from(v));
        }
        self.count += 1;
    }

    /// Mean of every sample, rounded half up.
    pub(super) fn average(&self) -> Array3<u8> {
        let n = self.count.max(1);
        self.sum.mapv(|s| ((s + n / 2) / n).min(255) as u8)
    }

    /// Plain sum, clamped to 255.
    pub(super) fn clamped_sum(&self) -> Array3<u8> {
        self.sum.mapv(|s| s.min(255) as u8)
    }

    /// Unrounded mean, for the auto-stretch.
    pub(super) fn mean_values(&self) -> Array3<f64> {
        let n = self.count.max(1) as f64;
        self.sum.mapv(|s| s as f64 / n)
    }

    /// Unclamped sum, for the auto-stretch.
    pub(super) fn sum_values(&self) -> Array3<f64> {
        self.sum.mapv(|s| s as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rounds_half_up() {
        let mut acc = Accumulator::new((1, 1, 3));
        acc.add(&Array3::from_shape_vec((1, 1, 3), vec![1, 0, 10]).unwrap());
        acc.add(&Array3::from_shape_vec((1, 1, 3), vec![2, 1, 11]).unwrap());
        // 1.5 -> 2, 0.5 -> 1, 10.5 -> 11
        assert_eq!(acc.average().iter().copied().collect::<Vec<_>>(), vec![2, 1, 11]);
    }

    #[test]
    fn sum_saturates() {
        let mut acc = Accumulator::new((1, 1, 3));
        let frame = Array3::from_elem((1, 1, 3), 200u8);
        acc.add(&frame);
        acc.add(&frame);
        assert!(acc.clamped_sum().iter().all(|&v| v == 255));
        assert!(acc.sum_values().iter().all(|&v| v == 400.0));
        assert!(acc.mean_values().iter().all(|&v| v == 200.0));
    }
}
