use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::FrameCache;
use crate::error::{Result, SerError};

/// Background thread that warms the cache ahead of sequential access.
///
/// Requests are hints: they are queued and return immediately, and a later
/// `get` for the same index either hits the cache or joins the decode that
/// is already in flight.
pub struct Prefetcher {
    tx: Option<mpsc::Sender<usize>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Prefetcher {
    pub fn spawn(cache: Arc<FrameCache>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<usize>();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("serview-prefetch".into())
            .spawn(move || {
                for index in rx {
                    if worker_stop.load(Ordering::Relaxed) {
                        break;
                    }
                    if cache.contains(index) {
                        continue;
                    }
                    match cache.get(index) {
                        Ok(_) => debug!(index, "Prefetched frame"),
                        Err(e) => warn!(index, error = %e, "Prefetch failed"),
                    }
                }
            })
            .map_err(|e| SerError::Worker(format!("failed to spawn prefetch thread: {e}")))?;

        Ok(Self {
            tx: Some(tx),
            stop,
            handle: Some(handle),
        })
    }

    /// Queue `index` for decoding. Never blocks.
    pub fn prefetch(&self, index: usize) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(index);
        }
    }

    /// Queue the `count` frames following `current`, clipped to `frame_count`.
    pub fn prefetch_after(&self, current: usize, count: usize, frame_count: usize) {
        let end = current.saturating_add(count).saturating_add(1).min(frame_count);
        for index in current + 1..end {
            self.prefetch(index);
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        // Pending hints are dropped; an in-progress decode still completes.
        self.stop.store(true, Ordering::Relaxed);
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
