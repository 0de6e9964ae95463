//! Sharpness scoring and frame selection for lucky-imaging stacks.

pub mod laplacian;
pub mod selection;

pub use laplacian::{laplacian_variance_array, luminance, sharpness};
pub use selection::FrameSelection;

/// Sharpness of one frame; higher is sharper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameScore {
    pub index: usize,
    pub score: f64,
}

/// Sort scores best first. Equal scores keep the lower frame index first.
pub fn rank_scores(scores: &mut [FrameScore]) {
    scores.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
}
