use serde::{Deserialize, Serialize};

use super::{rank_scores, FrameScore};
use crate::error::{Result, SerError};

/// Which frames of a stacking range are kept, by sharpness.
///
/// The default keeps every frame and skips scoring entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSelection {
    /// Keep the sharpest `best_percent` percent of the range, at least one frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_percent: Option<f32>,
    /// Reject frames whose score is below this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
}

impl FrameSelection {
    pub fn best_percent(percent: f32) -> Self {
        Self {
            best_percent: Some(percent),
            ..Self::default()
        }
    }

    pub fn min_score(score: f64) -> Self {
        Self {
            min_score: Some(score),
            ..Self::default()
        }
    }

    /// True when no frame can be rejected, so scoring is unnecessary.
    pub fn keeps_all(&self) -> bool {
        self.best_percent.is_none() && self.min_score.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.best_percent {
            if !(p > 0.0 && p <= 100.0) {
                return Err(SerError::InvalidSelection(format!(
                    "best_percent must be in (0, 100], got {p}"
                )));
            }
        }
        if let Some(s) = self.min_score {
            if !s.is_finite() {
                return Err(SerError::InvalidSelection(format!(
                    "min_score must be finite, got {s}"
                )));
            }
        }
        Ok(())
    }

    /// Number of frames `best_percent` keeps out of `candidates`.
    pub fn keep_count(&self, candidates: usize) -> usize {
        match self.best_percent {
            Some(p) => {
                let keep = (candidates as f64 * f64::from(p) / 100.0).floor() as usize;
                keep.clamp(1, candidates.max(1))
            }
            None => candidates,
        }
    }

    /// Apply the selection to `scores` and return the kept indices in
    /// ascending frame order.
    pub fn apply(&self, mut scores: Vec<FrameScore>) -> Vec<usize> {
        rank_scores(&mut scores);
        let keep = self.keep_count(scores.len());
        let mut kept: Vec<usize> = scores
            .into_iter()
            .take(keep)
            .filter(|s| self.min_score.map_or(true, |min| s.score >= min))
            .map(|s| s.index)
            .collect();
        kept.sort_unstable();
        kept
    }
}

impl std::fmt::Display for FrameSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.best_percent, self.min_score) {
            (None, None) => write!(f, "all frames"),
            (Some(p), None) => write!(f, "best {p}%"),
            (None, Some(s)) => write!(f, "score >= {s}"),
            (Some(p), Some(s)) => write!(f, "best {p}%, score >= {s}"),
        }
    }
}
