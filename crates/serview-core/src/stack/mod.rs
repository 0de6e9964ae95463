//! Combine a range of frames into one RGB8 image, optionally keeping only
//! the sharpest frames.

mod job;
mod mean;
mod median;
mod progress;
mod stretch;

pub use job::{StackJob, StackProgress};
pub use progress::{NoOpReporter, ProgressReporter, StackStage};
pub use crate::quality::FrameSelection;

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::FrameCache;
use crate::error::{Result, SerError};
use crate::frame::DecodedFrame;
use crate::quality::{sharpness, FrameScore};

use mean::Accumulator;
use median::median_stack;
use stretch::auto_stretch;

/// Per-sample combination rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StackMethod {
    #[default]
    Average,
    Median,
    /// Saturating sum, useful for faint targets.
    Sum,
}

impl std::fmt::Display for StackMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Average => write!(f, "average"),
            Self::Median => write!(f, "median"),
            Self::Sum => write!(f, "sum"),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a stack run.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Clone, Debug)]
pub struct StackRequest {
    /// Half-open range of frame indices.
    pub range: Range<usize>,
    pub method: StackMethod,
    /// Frames of `range` to keep. Keeps everything by default.
    pub selection: FrameSelection,
    /// Stretch the result between its 0.1 and 99.9 percentiles.
    pub auto_stretch: bool,
    pub cancel: CancellationToken,
}

impl StackRequest {
    pub fn new(range: Range<usize>, method: StackMethod) -> Self {
        Self {
            range,
            method,
            selection: FrameSelection::default(),
            auto_stretch: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_selection(mut self, selection: FrameSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_auto_stretch(mut self, enabled: bool) -> Self {
        self.auto_stretch = enabled;
        self
    }

    /// Number of frames the range covers, before selection.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackResult {
    /// (height, width, 3) RGB8 output.
    pub pixels: Array3<u8>,
    pub method: StackMethod,
    /// Indices that went into the result, ascending.
    pub frames: Vec<usize>,
    pub frames_combined: usize,
    pub stretched: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StackOutcome {
    Completed(StackResult),
    /// Stopped before frame `processed` of `total` in the running stage; no
    /// output is produced.
    Cancelled { processed: usize, total: usize },
}

impl StackOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn into_result(self) -> Option<StackResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Stack `request.range` using frames from `cache`.
///
/// Ranges that fit in the cache go through the normal LRU path, so a
/// repeated stack over the same frames decodes nothing. Larger ranges read
/// cache-through to avoid flushing the frames a viewer is working with.
///
/// With a non-trivial [`FrameSelection`] every frame of the range is first
/// scored (stage [`StackStage::Scoring`]) and only the kept frames are read
/// again and combined.
pub fn stack(
    cache: &FrameCache,
    request: &StackRequest,
    reporter: &dyn ProgressReporter,
) -> Result<StackOutcome> {
    let Range { start, end } = request.range;
    if start >= end {
        return Err(SerError::EmptyRange { start, end });
    }
    let frame_count = cache.frame_count();
    if end > frame_count {
        return Err(SerError::out_of_bounds(end - 1, frame_count));
    }
    request.selection.validate()?;

    let cached = end - start <= cache.capacity();
    let started = Instant::now();
    info!(
        start,
        end,
        method = %request.method,
        selection = %request.selection,
        auto_stretch = request.auto_stretch,
        through_cache = cached,
        "Stacking frames"
    );

    let fetch = |index: usize| {
        if cached {
            cache.get(index)
        } else {
            cache.get_transient(index)
        }
    };

    let outcome = run(request, &fetch, reporter)?;

    match &outcome {
        StackOutcome::Completed(result) => info!(
            frames = result.frames_combined,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stacking complete"
        ),
        StackOutcome::Cancelled { processed, total } => {
            info!(processed, total, "Stacking cancelled")
        }
    }
    Ok(outcome)
}

fn run<F>(
    request: &StackRequest,
    fetch: &F,
    reporter: &dyn ProgressReporter,
) -> Result<StackOutcome>
where
    F: Fn(usize) -> Result<Arc<DecodedFrame>>,
{
    let candidates: Vec<usize> = request.range.clone().collect();
    let frames = if request.selection.keeps_all() {
        candidates
    } else {
        reporter.begin_stage(StackStage::Scoring, Some(candidates.len()));
        let mut scores = Vec::with_capacity(candidates.len());
        let visited = visit_frames(&candidates, request, fetch, reporter, |index, frame, _| {
            scores.push(FrameScore {
                index,
                score: sharpness(&frame),
            });
        });
        reporter.finish_stage();
        if let Some(processed) = visited? {
            return Ok(StackOutcome::Cancelled {
                processed,
                total: candidates.len(),
            });
        }
        select(&request.selection, scores)?
    };

    reporter.begin_stage(StackStage::Reading, Some(frames.len()));
    let outcome = combine(request, frames, fetch, reporter);
    reporter.finish_stage();
    outcome
}

fn select(selection: &FrameSelection, scores: Vec<FrameScore>) -> Result<Vec<usize>> {
    let scored = scores.len();
    let best = scores.iter().map(|s| s.score).fold(f64::NEG_INFINITY, f64::max);
    let worst = scores.iter().map(|s| s.score).fold(f64::INFINITY, f64::min);
    debug!(best, worst, "Sharpness range");

    let kept = selection.apply(scores);
    if kept.is_empty() {
        return Err(SerError::NoFramesSelected { scored });
    }
    info!(kept = kept.len(), scored, %selection, "Frame selection");
    Ok(kept)
}

fn combine<F>(
    request: &StackRequest,
    frames: Vec<usize>,
    fetch: &F,
    reporter: &dyn ProgressReporter,
) -> Result<StackOutcome>
where
    F: Fn(usize) -> Result<Arc<DecodedFrame>>,
{
    let total = frames.len();
    let cancelled = |processed| StackOutcome::Cancelled { processed, total };

    let pixels = match request.method {
        StackMethod::Average | StackMethod::Sum => {
            let mut acc: Option<Accumulator> = None;
            let visited = visit_frames(&frames, request, fetch, reporter, |_, frame, shape| {
                acc.get_or_insert_with(|| Accumulator::new(shape))
                    .add(&frame.pixels);
            })?;
            if let Some(processed) = visited {
                return Ok(cancelled(processed));
            }
            let Some(acc) = acc else {
                return Err(SerError::EmptyRange {
                    start: request.range.start,
                    end: request.range.end,
                });
            };
            match (request.method, request.auto_stretch) {
                (StackMethod::Sum, false) => acc.clamped_sum(),
                (StackMethod::Sum, true) => auto_stretch(&acc.sum_values()),
                (_, false) => acc.average(),
                (_, true) => auto_stretch(&acc.mean_values()),
            }
        }
        StackMethod::Median => {
            let mut decoded = Vec::with_capacity(total);
            let visited =
                visit_frames(&frames, request, fetch, reporter, |_, frame, _| decoded.push(frame))?;
            if let Some(processed) = visited {
                return Ok(cancelled(processed));
            }
            reporter.finish_stage();
            reporter.begin_stage(StackStage::Combining, None);
            let median = median_stack(&decoded);
            if request.auto_stretch {
                auto_stretch(&median.mapv(f64::from))
            } else {
                median
            }
        }
    };

    Ok(StackOutcome::Completed(StackResult {
        pixels,
        method: request.method,
        frames_combined: total,
        frames,
        stretched: request.auto_stretch,
    }))
}

/// Fetch each of `indices` in order and hand it to `visit` along with its
/// index and the expected shape.
///
/// The cancellation token is checked before each frame. Returns
/// `Some(processed)` if the run was cancelled, `None` once every frame was
/// visited.
fn visit_frames<F>(
    indices: &[usize],
    request: &StackRequest,
    fetch: &F,
    reporter: &dyn ProgressReporter,
    mut visit: impl FnMut(usize, Arc<DecodedFrame>, (usize, usize, usize)),
) -> Result<Option<usize>>
where
    F: Fn(usize) -> Result<Arc<DecodedFrame>>,
{
    let mut shape = None;
    for (done, &index) in indices.iter().enumerate() {
        if request.cancel.is_cancelled() {
            return Ok(Some(done));
        }
        let frame = fetch(index)?;
        let dim = frame.pixels.dim();
        let expected = *shape.get_or_insert(dim);
        if dim != expected {
            return Err(SerError::InvalidFormat(format!(
                "frame {index} has shape {dim:?}, expected {expected:?}"
            )));
        }
        visit(index, frame, expected);
        reporter.advance(done + 1);
    }
    Ok(None)
}
