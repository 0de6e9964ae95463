use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use tracing::warn;

use super::{stack, ProgressReporter, StackOutcome, StackRequest, StackStage};
use crate::cache::FrameCache;
use crate::error::{Result, SerError};

/// Snapshot of a running job. `done` and `total` count frames of `stage`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackProgress {
    pub stage: Option<StackStage>,
    pub done: usize,
    pub total: usize,
}

impl StackProgress {
    /// Completed share in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.done as f32 / self.total as f32
    }
}

/// Progress of the running stage, written by the worker and read by the handle.
struct SharedProgress {
    stage: Mutex<Option<StackStage>>,
    done: AtomicUsize,
    total: AtomicUsize,
}

impl SharedProgress {
    fn new(total: usize) -> Self {
        Self {
            stage: Mutex::new(None),
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(total),
        }
    }
}

impl ProgressReporter for SharedProgress {
    fn begin_stage(&self, stage: StackStage, total_items: Option<usize>) {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = Some(stage);
        if let Some(total) = total_items {
            self.done.store(0, Ordering::Relaxed);
            self.total.store(total, Ordering::Relaxed);
        }
    }

    fn advance(&self, items_done: usize) {
        self.done.store(items_done, Ordering::Relaxed);
    }
}

/// Handle to a stack running on a background thread.
///
/// Dropping the handle cancels the run and waits for the worker to stop.
pub struct StackJob {
    request: StackRequest,
    progress: Arc<SharedProgress>,
    rx: mpsc::Receiver<Result<StackOutcome>>,
    handle: Option<JoinHandle<()>>,
    delivered: bool,
}

impl StackJob {
    pub fn spawn(cache: Arc<FrameCache>, request: StackRequest) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let progress = Arc::new(SharedProgress::new(request.len()));

        let worker_request = request.clone();
        let worker_progress = Arc::clone(&progress);
        let handle = std::thread::Builder::new()
            .name("serview-stack".into())
            .spawn(move || {
                let outcome = stack(&cache, &worker_request, worker_progress.as_ref());
                if let Err(e) = &outcome {
                    warn!(error = %e, "Stack job failed");
                }
                let _ = tx.send(outcome);
            })
            .map_err(|e| SerError::Worker(format!("failed to spawn stack thread: {e}")))?;

        Ok(Self {
            request,
            progress,
            rx,
            handle: Some(handle),
            delivered: false,
        })
    }

    pub fn request(&self) -> &StackRequest {
        &self.request
    }

    pub fn progress(&self) -> StackProgress {
        StackProgress {
            stage: *self
                .progress
                .stage
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            done: self.progress.done.load(Ordering::Relaxed),
            total: self.progress.total.load(Ordering::Relaxed),
        }
    }

    /// Ask the worker to stop before its next frame.
    pub fn cancel(&self) {
        self.request.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Non-blocking poll. Returns the outcome once, then `None`.
    pub fn try_result(&mut self) -> Option<Result<StackOutcome>> {
        if self.delivered {
            return None;
        }
        let result = match self.rx.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(worker_lost()),
        };
        self.delivered = true;
        self.join();
        Some(result)
    }

    /// Block until the worker finishes.
    pub fn wait(mut self) -> Result<StackOutcome> {
        if self.delivered {
            return Err(SerError::Worker("stack result already taken".into()));
        }
        let result = self.rx.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.delivered = true;
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Stack worker panicked");
            }
        }
    }
}

impl Drop for StackJob {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            self.join();
        }
    }
}

impl std::fmt::Debug for StackJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackJob")
            .field("request", &self.request)
            .field("progress", &self.progress())
            .finish()
    }
}

fn worker_lost() -> SerError {
    SerError::Worker("stack worker exited without a result".into())
}
