use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consts::{DOTNET_UNIX_OFFSET_TICKS, FILETIME_UNIX_OFFSET_TICKS, TICKS_PER_SECOND};
use crate::error::Result;
use crate::io::ser::{FileMetadata, SerReader};

/// Origin of the 100 ns tick values stored in SER headers and trailers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampEpoch {
    /// 1601-01-01 UTC, as written by Windows `FILETIME`-based capture tools.
    #[default]
    WindowsFileTime,
    /// 0001-01-01 UTC, the .NET `DateTime` tick origin.
    DotNet,
}

impl TimestampEpoch {
    fn unix_offset_ticks(self) -> i64 {
        match self {
            Self::WindowsFileTime => FILETIME_UNIX_OFFSET_TICKS,
            Self::DotNet => DOTNET_UNIX_OFFSET_TICKS,
        }
    }
}

impl std::fmt::Display for TimestampEpoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WindowsFileTime => write!(f, "Windows FILETIME (1601)"),
            Self::DotNet => write!(f, ".NET ticks (0001)"),
        }
    }
}

/// Convert a tick value to a UTC timestamp.
///
/// Zero means "not recorded" and maps to `None`, as do values outside the
/// range chrono can represent.
pub fn ticks_to_datetime(ticks: i64, epoch: TimestampEpoch) -> Option<DateTime<Utc>> {
    if ticks == 0 {
        return None;
    }
    let unix_ticks = ticks.checked_sub(epoch.unix_offset_ticks())?;
    let secs = unix_ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = (unix_ticks.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos)
}

/// Timestamp of one frame from the trailer, `None` when the file has no trailer.
pub fn frame_timestamp(
    reader: &SerReader,
    index: usize,
    epoch: TimestampEpoch,
) -> Result<Option<DateTime<Utc>>> {
    Ok(reader
        .timestamp_ticks(index)?
        .and_then(|ticks| ticks_to_datetime(ticks, epoch)))
}

/// Header capture times as `(local, utc)`.
pub fn capture_times(
    metadata: &FileMetadata,
    epoch: TimestampEpoch,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        ticks_to_datetime(metadata.date_time, epoch),
        ticks_to_datetime(metadata.date_time_utc, epoch),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filetime_unix_epoch() {
        let dt = ticks_to_datetime(FILETIME_UNIX_OFFSET_TICKS + 1, TimestampEpoch::WindowsFileTime)
            .unwrap();
        assert_eq!(dt.timestamp(), 0);
        assert_eq!(dt.timestamp_subsec_nanos(), 100);
    }

    #[test]
    fn dotnet_known_date() {
        // 2024-01-01T00:00:00Z = 1_704_067_200 unix seconds.
        let ticks = DOTNET_UNIX_OFFSET_TICKS + 1_704_067_200 * TICKS_PER_SECOND;
        let dt = ticks_to_datetime(ticks, TimestampEpoch::DotNet).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn zero_ticks_is_unrecorded() {
        assert!(ticks_to_datetime(0, TimestampEpoch::DotNet).is_none());
    }

    #[test]
    fn pre_unix_times_round_down() {
        let ticks = FILETIME_UNIX_OFFSET_TICKS - 5;
        let dt = ticks_to_datetime(ticks, TimestampEpoch::WindowsFileTime).unwrap();
        assert_eq!(dt.timestamp(), -1);
        assert_eq!(dt.timestamp_subsec_nanos(), 999_999_500);
    }
}
