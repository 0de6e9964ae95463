/// Stacking phase, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackStage {
    /// Decoding frames and scoring their sharpness for selection.
    Scoring,
    /// Decoding frames and folding them into the running result.
    Reading,
    /// Computing the per-pixel result once all frames are in.
    Combining,
}

impl std::fmt::Display for StackStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scoring => write!(f, "Scoring frames"),
            Self::Reading => write!(f, "Reading frames"),
            Self::Combining => write!(f, "Combining"),
        }
    }
}

/// Thread-safe progress reporting for a stack run.
///
/// All methods default to no-ops so implementors only override what they
/// display.
pub trait ProgressReporter: Send + Sync {
    /// A stage has started. `total_items` is the number of frames in it, if known.
    fn begin_stage(&self, _stage: StackStage, _total_items: Option<usize>) {}

    /// `items_done` frames of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    fn finish_stage(&self) {}
}

/// Reporter that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpReporter;

impl ProgressReporter for NoOpReporter {}
