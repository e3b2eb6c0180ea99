// tests/test_rotation.rs
use chrono::{Duration as Days, Local, NaiveDate, TimeZone};
use rs_daylog::context::CorrelationHeader;
use rs_daylog::loggers::{DailyLogger, LogRecord, LoggerBuilder, ManualClock, OutputMode};
use rs_daylog::LogError;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

use rs_daylog::info;

fn clock_at_march_first() -> Arc<ManualClock> {
    ManualClock::new(Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
}

fn start(dir: &Path, clock: Arc<ManualClock>) -> DailyLogger {
    LoggerBuilder::new(dir, "app.log").with_clock(clock).build().unwrap()
}

/// Names of backup files in `dir`, sorted.
fn backups(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("app.log."))
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn day_change_rotates_exactly_once() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = start(dir.path(), clock.clone());

    info!(logger, CorrelationHeader::new("d1"), "first day");
    logger.flush().await;

    assert_eq!(logger.check_rotation().await.unwrap(), None, "same day, nothing to do");

    clock.advance(Days::days(1));
    let backup = logger.check_rotation().await.unwrap().expect("rotated");
    assert_eq!(backup, dir.path().join("app.log.2024-03-01"));
    assert!(fs::read_to_string(&backup).unwrap().contains("MSG:first day"));
    assert_eq!(fs::read_to_string(logger.live_path()).unwrap(), "");
    assert_eq!(logger.opened_on().await, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

    for _ in 0..3 {
        assert_eq!(logger.check_rotation().await.unwrap(), None);
    }
    assert_eq!(backups(dir.path()), vec!["app.log.2024-03-01"]);
}

#[tokio::test]
async fn forced_rotations_on_one_day_get_distinct_suffixes() {
    let dir = tempdir().unwrap();
    let logger = start(dir.path(), clock_at_march_first());

    for _ in 0..4 {
        logger.rotate_now().await.unwrap();
    }

    assert_eq!(
        backups(dir.path()),
        vec![
            "app.log.2024-03-01",
            "app.log.2024-03-01_0",
            "app.log.2024-03-01_1",
            "app.log.2024-03-01_2",
        ]
    );
}

#[tokio::test]
async fn entries_land_on_their_side_of_the_rotation() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = start(dir.path(), clock.clone());
    let h = CorrelationHeader::new("edge");

    info!(logger, h, "before");
    logger.flush().await;
    clock.advance(Days::days(1));
    let backup = logger.check_rotation().await.unwrap().unwrap();
    info!(logger, h, "after");
    logger.flush().await;

    let old = fs::read_to_string(backup).unwrap();
    let new = fs::read_to_string(logger.live_path()).unwrap();
    assert!(old.contains("MSG:before") && !old.contains("MSG:after"));
    assert!(new.contains("MSG:after") && !new.contains("MSG:before"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rotating_under_load_keeps_every_entry_whole() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = LoggerBuilder::new(dir.path(), "app.log")
        .with_clock(clock.clone())
        .with_mode(OutputMode::Structured)
        .with_queue_capacity(8)
        .build()
        .unwrap();

    let producers: Vec<_> = (0..50)
        .map(|p| {
            let logger = logger.clone();
            tokio::spawn(async move {
                let h = CorrelationHeader::new(format!("p{}", p));
                for n in 0..200 {
                    info!(logger, h, "entry {}", n);
                }
            })
        })
        .collect();

    for _ in 0..5 {
        clock.advance(Days::days(1));
        assert!(logger.check_rotation().await.unwrap().is_some());
        assert!(logger.rotate_now().await.unwrap().is_some());
        tokio::task::yield_now().await;
    }

    for producer in futures::future::join_all(producers).await {
        producer.unwrap();
    }
    logger.flush().await;

    let mut total = 0;
    let mut seen = HashSet::new();
    for entry in fs::read_dir(dir.path()).unwrap() {
        let path = entry.unwrap().path();
        for line in fs::read_to_string(&path).unwrap().lines() {
            let record: LogRecord = serde_json::from_str(line)
                .unwrap_or_else(|e| panic!("torn line in {}: {:?}: {}", path.display(), line, e));
            seen.insert((record.logid, record.msg.to_string()));
            total += 1;
        }
    }
    assert_eq!(total, 10_000);
    assert_eq!(seen.len(), 10_000, "duplicated entries");
    assert_eq!(backups(dir.path()).len(), 10);
}

#[tokio::test]
async fn clock_moving_backwards_does_not_rotate() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = start(dir.path(), clock.clone());

    clock.advance(-Days::days(1));
    assert_eq!(logger.check_rotation().await.unwrap(), None);
    assert!(backups(dir.path()).is_empty());
}

#[tokio::test]
async fn monitor_rotates_on_its_own_tick() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = LoggerBuilder::new(dir.path(), "app.log")
        .with_clock(clock.clone())
        .with_scan_interval(Duration::from_millis(20))
        .build()
        .unwrap();

    info!(logger, CorrelationHeader::default(), "yesterday");
    logger.flush().await;
    clock.advance(Days::days(1));

    let backup = dir.path().join("app.log.2024-03-01");
    let appeared = tokio::time::timeout(Duration::from_secs(5), async {
        while !backup.exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(appeared.is_ok(), "monitor never rotated");

    // Give the monitor a few more ticks; nothing else may happen today.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backups(dir.path()), vec!["app.log.2024-03-01"]);
    logger.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_rename_is_logged_and_retried() {
    let dir = tempdir().unwrap();
    let clock = clock_at_march_first();
    let logger = start(dir.path(), clock.clone());

    // The live file vanishes under the logger: the rename has nothing to move.
    fs::remove_file(logger.live_path()).unwrap();
    clock.advance(Days::days(1));

    let err = logger.check_rotation().await.unwrap_err();
    assert!(matches!(err, LogError::RotateFailed { ref stage, .. } if stage == "rename"));
    assert_eq!(logger.opened_on().await, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

    logger.flush().await;
    let live = fs::read_to_string(logger.live_path()).unwrap();
    assert!(live.contains("[ERROR]") && live.contains("logger rotate error"), "{}", live);

    // Next tick finds the reopened file and completes the rotation.
    let backup = logger.check_rotation().await.unwrap().unwrap();
    assert!(fs::read_to_string(backup).unwrap().contains("logger rotate error"));
    assert_eq!(logger.opened_on().await, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
}

#[tokio::test]
async fn rotation_after_shutdown_is_refused() {
    let dir = tempdir().unwrap();
    let logger = start(dir.path(), clock_at_march_first());
    logger.shutdown().await.unwrap();

    assert!(logger.rotate_now().await.is_err());
    assert!(backups(dir.path()).is_empty());
}
