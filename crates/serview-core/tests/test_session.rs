mod common;

use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use common::{write_test_ser, SerBuilder, TICKS_2024};
use serview_core::color::{DemosaicChoice, DemosaicStrategy};
use serview_core::io::timestamp::TimestampEpoch;
use serview_core::{SerError, Session, SessionConfig};

fn timed_session() -> Session {
    SerBuilder::mono8(2, 2)
        .capture_time(TICKS_2024)
        .flat_frames(&[1, 2, 3])
        .timestamps(vec![TICKS_2024, TICKS_2024 + 5_000_000, 0])
        .session()
}

#[test]
fn test_open_from_path() {
    let file = write_test_ser(&SerBuilder::mono8(4, 4).flat_frames(&[9, 8]).build());
    let session = Session::open(file.path(), &SessionConfig::default()).unwrap();
    assert_eq!(session.frame_count(), 2);
    assert_eq!(session.metadata().width, 4);
    let frame = session.decode_frame(1).unwrap();
    assert_eq!(frame.index, 1);
    assert_eq!(frame.rgb(3, 3), [8, 8, 8]);
}

#[test]
fn test_open_rejects_invalid_config() {
    let file = write_test_ser(&SerBuilder::mono8(1, 1).flat_frames(&[1]).build());
    let config = SessionConfig {
        cache_capacity: 0,
        ..SessionConfig::default()
    };
    assert!(matches!(
        Session::open(file.path(), &config).unwrap_err(),
        SerError::Config(_)
    ));
}

#[test]
fn test_decode_frame_bounds() {
    let session = SerBuilder::mono8(1, 1).flat_frames(&[1, 2, 3]).session();
    assert!(matches!(
        session.decode_frame(-1).unwrap_err(),
        SerError::FrameIndexOutOfBounds { index: -1, total: 3 }
    ));
    assert!(matches!(
        session.decode_frame(3).unwrap_err(),
        SerError::FrameIndexOutOfBounds { index: 3, total: 3 }
    ));
    assert_eq!(session.decode_frame(2).unwrap().rgb(0, 0), [3, 3, 3]);
}

#[test]
fn test_decode_frame_is_cached() {
    let session = SerBuilder::mono8(1, 1).flat_frames(&[1, 2]).session();
    let a = session.decode_frame(0).unwrap();
    let b = session.decode_frame(0).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(session.cache().stats().decodes, 1);
}

#[test]
fn test_timestamps_from_trailer() {
    let session = timed_session();
    let t0 = session.timestamp_of(0).unwrap().unwrap();
    let t1 = session.timestamp_of(1).unwrap().unwrap();
    assert_eq!(t0, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    assert_eq!((t1 - t0).num_milliseconds(), 500);
    // Zero ticks mean "not recorded".
    assert_eq!(session.timestamp_of(2).unwrap(), None);
    assert!(matches!(
        session.timestamp_of(3).unwrap_err(),
        SerError::FrameIndexOutOfBounds { .. }
    ));
}

#[test]
fn test_decoded_frame_carries_timestamp() {
    let session = timed_session();
    let frame = session.decode_frame(1).unwrap();
    assert_eq!(frame.timestamp, session.timestamp_of(1).unwrap());
}

#[test]
fn test_no_trailer_means_no_timestamps() {
    let session = SerBuilder::mono8(1, 1).flat_frames(&[1, 2]).session();
    assert!(!session.metadata().has_timestamps);
    assert_eq!(session.timestamp_of(0).unwrap(), None);
    assert_eq!(session.decode_frame(0).unwrap().timestamp, None);
}

#[test]
fn test_capture_times() {
    let (local, utc) = timed_session().capture_times();
    let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(local, Some(expected));
    assert_eq!(utc, Some(expected));

    let (local, utc) = SerBuilder::mono8(1, 1).flat_frames(&[1]).session().capture_times();
    assert_eq!((local, utc), (None, None));
}

#[test]
fn test_dotnet_epoch() {
    // 2024-01-01 as .NET ticks.
    let ticks = 638_396_640_000_000_000;
    let config = SessionConfig {
        timestamp_epoch: TimestampEpoch::DotNet,
        ..SessionConfig::default()
    };
    let session = SerBuilder::mono8(1, 1)
        .flat_frames(&[1])
        .timestamps(vec![ticks])
        .session_with(&config);
    assert_eq!(
        session.timestamp_of(0).unwrap(),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_prefetch_ahead_warms_cache() {
    let config = SessionConfig {
        prefetch_ahead: 2,
        ..SessionConfig::default()
    };
    let session = SerBuilder::mono8(2, 2)
        .flat_frames(&[0, 1, 2, 3, 4, 5])
        .session_with(&config);
    session.prefetch_ahead(1).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while !(session.cache().contains(2) && session.cache().contains(3)) {
        assert!(Instant::now() < deadline, "prefetch did not finish");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!session.cache().contains(4));
    assert!(session.prefetch_ahead(6).is_err());
    assert!(session.prefetch(-1).is_err());
}

#[test]
fn test_demosaic_strategy_resolved_from_config() {
    let config = SessionConfig {
        demosaic: DemosaicChoice::Grayscale,
        ..SessionConfig::default()
    };
    let session = SerBuilder::mono8(1, 1).flat_frames(&[1]).session_with(&config);
    assert_eq!(session.demosaic_strategy(), DemosaicStrategy::GrayscaleFallback);
    assert_eq!(
        SerBuilder::mono8(1, 1).flat_frames(&[1]).session().demosaic_strategy(),
        DemosaicStrategy::Full(Default::default())
    );
}
