/// Size of the fixed SER file header in bytes.
pub const SER_HEADER_SIZE: usize = 178;

/// File identifier at the start of every SER file.
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// Length of each fixed-width text field (observer, instrument, telescope).
pub const SER_TEXT_FIELD_LEN: usize = 40;

/// Size of one per-frame timestamp in the optional trailer.
pub const TIMESTAMP_SIZE: usize = 8;

/// Number of channels in a decoded frame (R, G, B).
pub const RGB_CHANNELS: usize = 3;

/// Default number of decoded frames kept by the frame cache.
/// A 1920x1080 RGB8 frame is ~6 MB, so the default bounds the cache at ~60 MB.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Default number of frames requested ahead of the current one during playback.
pub const DEFAULT_PREFETCH_AHEAD: usize = 5;

/// Rec. 601 luma weights used for sharpness scoring.
pub const LUMINANCE_R: f32 = 0.299;
pub const LUMINANCE_G: f32 = 0.587;
pub const LUMINANCE_B: f32 = 0.114;

/// Percentiles (0..=100) mapped to black and white by the auto-stretch.
pub const STRETCH_LOW_PERCENTILE: f64 = 0.1;
pub const STRETCH_HIGH_PERCENTILE: f64 = 99.9;

/// Percentile spans narrower than this are left unstretched.
pub const STRETCH_EPSILON: f64 = 1e-10;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// 100 ns ticks between 1601-01-01 (Windows FILETIME epoch) and 1970-01-01.
pub const FILETIME_UNIX_OFFSET_TICKS: i64 = 116_444_736_000_000_000;

/// 100 ns ticks between 0001-01-01 (.NET DateTime epoch) and 1970-01-01.
pub const DOTNET_UNIX_OFFSET_TICKS: i64 = 621_355_968_000_000_000;

/// Number of 100 ns ticks per second.
pub const TICKS_PER_SECOND: i64 = 10_000_000;
