//! One open SER file with its decoder, frame cache and background workers.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::{FrameCache, FrameSource, Prefetcher};
use crate::color::{DemosaicStrategy, Normalizer};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::frame::{ColorFormat, DecodedFrame};
use crate::io::ser::{FileMetadata, SerReader};
use crate::io::timestamp::{capture_times, frame_timestamp, TimestampEpoch};
use crate::stack::{
    self, NoOpReporter, ProgressReporter, StackJob, StackMethod, StackOutcome, StackRequest,
};

/// Reader + normalizer, decoding frame `i` to RGB8 with its timestamp.
#[derive(Debug)]
pub struct SerDecoder {
    reader: SerReader,
    normalizer: Normalizer,
    epoch: TimestampEpoch,
}

impl SerDecoder {
    pub fn new(reader: SerReader, normalizer: Normalizer, epoch: TimestampEpoch) -> Self {
        Self {
            reader,
            normalizer,
            epoch,
        }
    }

    pub fn reader(&self) -> &SerReader {
        &self.reader
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

impl FrameSource for SerDecoder {
    fn frame_count(&self) -> usize {
        self.reader.frame_count()
    }

    fn decode(&self, index: usize) -> Result<DecodedFrame> {
        let raw = self.reader.frame_raw(index)?;
        let mut frame = self.normalizer.normalize(raw, &self.reader.metadata)?;
        frame.timestamp = frame_timestamp(&self.reader, index, self.epoch)?;
        Ok(frame)
    }
}

/// Everything a viewer needs for one file.
pub struct Session {
    decoder: Arc<SerDecoder>,
    cache: Arc<FrameCache>,
    prefetcher: Prefetcher,
    config: SessionConfig,
}

impl Session {
    /// Open `path` and build the decode pipeline described by `config`.
    pub fn open(path: &Path, config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let reader = SerReader::open(path)?;
        Self::with_reader(reader, config)
    }

    /// Build a session over an in-memory SER image.
    pub fn from_bytes(bytes: Vec<u8>, config: &SessionConfig) -> Result<Self> {
        config.validate()?;
        let reader = SerReader::from_bytes(bytes)?;
        Self::with_reader(reader, config)
    }

    fn with_reader(reader: SerReader, config: &SessionConfig) -> Result<Self> {
        let strategy = DemosaicStrategy::resolve(config.demosaic);
        let normalizer = Normalizer::new(strategy, config.cfa_remap.clone());
        let format = normalizer.effective_format(&reader.metadata);
        info!(
            declared = %reader.metadata.color_format,
            decoded_as = %format,
            demosaic = %strategy,
            cache_capacity = config.cache_capacity,
            "Session ready"
        );

        let decoder = Arc::new(SerDecoder::new(reader, normalizer, config.timestamp_epoch));
        let source: Arc<dyn FrameSource> = decoder.clone();
        let cache = Arc::new(FrameCache::new(source, config.cache_capacity));
        let prefetcher = Prefetcher::spawn(Arc::clone(&cache))?;

        Ok(Self {
            decoder,
            cache,
            prefetcher,
            config: config.clone(),
        })
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.decoder.reader.metadata
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn frame_count(&self) -> usize {
        self.decoder.frame_count()
    }

    /// Color layout frames are decoded as, after camera remapping.
    pub fn effective_format(&self) -> ColorFormat {
        self.decoder.normalizer.effective_format(self.metadata())
    }

    pub fn demosaic_strategy(&self) -> DemosaicStrategy {
        self.decoder.normalizer.strategy()
    }

    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    /// Decode frame `index` through the cache.
    pub fn decode_frame(&self, index: i64) -> Result<Arc<DecodedFrame>> {
        let index = self.decoder.reader.check_index(index)?;
        self.cache.get(index)
    }

    /// Hint that frame `index` will be needed soon.
    pub fn prefetch(&self, index: i64) -> Result<()> {
        let index = self.decoder.reader.check_index(index)?;
        self.prefetcher.prefetch(index);
        Ok(())
    }

    /// Queue the configured number of frames after `current`.
    pub fn prefetch_ahead(&self, current: i64) -> Result<()> {
        let current = self.decoder.reader.check_index(current)?;
        self.prefetcher
            .prefetch_after(current, self.config.prefetch_ahead, self.frame_count());
        Ok(())
    }

    /// Trailer timestamp of frame `index`; `None` when the file has none.
    pub fn timestamp_of(&self, index: i64) -> Result<Option<DateTime<Utc>>> {
        let index = self.decoder.reader.check_index(index)?;
        frame_timestamp(&self.decoder.reader, index, self.config.timestamp_epoch)
    }

    /// Header capture times as `(local, utc)`.
    pub fn capture_times(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        capture_times(self.metadata(), self.config.timestamp_epoch)
    }

    /// Request for `range` carrying the configured selection and stretch.
    pub fn stack_request(&self, range: Range<usize>, method: StackMethod) -> StackRequest {
        let stacking = &self.config.stacking;
        StackRequest::new(range, method)
            .with_selection(stacking.selection())
            .with_auto_stretch(stacking.auto_stretch)
    }

    /// Stack `range` on a background thread.
    pub fn start_stack(&self, range: Range<usize>, method: StackMethod) -> Result<StackJob> {
        self.start_stack_with(self.stack_request(range, method))
    }

    pub fn start_stack_with(&self, request: StackRequest) -> Result<StackJob> {
        StackJob::spawn(Arc::clone(&self.cache), request)
    }

    /// Stack `range` on the calling thread.
    pub fn stack(&self, range: Range<usize>, method: StackMethod) -> Result<StackOutcome> {
        self.stack_with(&self.stack_request(range, method), &NoOpReporter)
    }

    /// Blocking stack with a caller-supplied token and reporter.
    pub fn stack_with(
        &self,
        request: &StackRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<StackOutcome> {
        stack::stack(&self.cache, request, reporter)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.decoder.reader.path())
            .field("frames", &self.frame_count())
            .field("cache", &self.cache)
            .finish()
    }
}
