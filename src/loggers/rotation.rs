//! Day-boundary rotation.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::diag;
use crate::core::error::LogError;
use crate::loggers::builder::{DailyLogger, Shared};
use crate::loggers::core::CallSite;

impl DailyLogger {
    /// One monitor tick: rotates if today is later than the date the live file
    /// was opened for. Returns the backup path when a rotation happened.
    pub async fn check_rotation(&self) -> Result<Option<PathBuf>, LogError> {
        self.shared.check_rotation().await
    }

    /// Rotates regardless of the date. The backup is named after the date the
    /// live file was opened for, with a numeric suffix if that name is taken.
    pub async fn rotate_now(&self) -> Result<Option<PathBuf>, LogError> {
        let today = self.shared.clock.today();
        self.shared.rotate(today, true).await
    }

    /// Date the live file was opened for.
    pub async fn opened_on(&self) -> NaiveDate {
        self.shared.file.read().await.opened_on()
    }
}

impl Shared {
    pub(crate) async fn check_rotation(&self) -> Result<Option<PathBuf>, LogError> {
        let today = self.clock.today();
        let due = {
            let file = self.file.read().await;
            today > file.opened_on() || !file.is_open()
        };
        if !due {
            return Ok(None);
        }
        self.rotate(today, false).await
    }

    async fn rotate(&self, today: NaiveDate, force: bool) -> Result<Option<PathBuf>, LogError> {
        let live = self.live_path.clone();
        let (result, still_open) = self
            .with_file_exclusive(move |file| {
                if !force && today <= file.opened_on() && file.is_open() {
                    return (Ok(None), true);
                }
                let result = file.swap(&live, today);
                (result, file.is_open())
            })
            .await?;

        if let Err(e) = &result {
            if still_open {
                let site = CallSite::new(file!(), line!());
                self.report_internal(site, format!("logger rotate error: {}", e));
            } else {
                diag::report(format_args!("{}", e));
            }
        }
        result
    }
}

/// Periodic task that triggers rotation when the calendar day changes.
pub(crate) struct RotationMonitor {
    shared: Arc<Shared>,
    stop: watch::Receiver<bool>,
}

impl RotationMonitor {
    pub(crate) fn new(shared: Arc<Shared>, stop: watch::Receiver<bool>) -> Self {
        Self { shared, stop }
    }

    pub(crate) async fn run(mut self) {
        let every = self.shared.config.scan_interval();
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if *self.stop.borrow() {
            return;
        }
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are already reported; the next tick retries.
                    let _ = self.shared.check_rotation().await;
                }
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        break;
                    }
                }
            }
        }
    }
}
