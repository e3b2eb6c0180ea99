//! The live output file and the rename/recreate sequence used by rotation.

use chrono::NaiveDate;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::LogError;

/// Date suffix of backup files.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Open handle plus the calendar date it was opened for.
///
/// `file` is `None` only while a rotation is between close and create, after a
/// failed create, or after shutdown. Clones of the handle only live for the
/// duration of one write made under the shared lock.
#[derive(Debug)]
pub struct LogFile {
    file: Option<Arc<File>>,
    opened_on: NaiveDate,
    shut: bool,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl LogFile {
    pub fn open(path: &Path, today: NaiveDate) -> io::Result<Self> {
        Ok(Self {
            file: Some(Arc::new(open_append(path)?)),
            opened_on: today,
            shut: false,
        })
    }

    /// Placeholder holding no handle, used while the real one is moved to a
    /// blocking thread.
    pub(crate) fn detached(opened_on: NaiveDate) -> Self {
        Self {
            file: None,
            opened_on,
            shut: false,
        }
    }

    /// Handle for a write made off the async runtime. `&File` implements
    /// `Write`, so shared access is enough to append.
    pub fn handle(&self) -> Option<Arc<File>> {
        self.file.clone()
    }

    pub fn opened_on(&self) -> NaiveDate {
        self.opened_on
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Moves the live file aside and opens a fresh one dated `today`.
    ///
    /// Returns the backup path, or `None` when there was no open file to move
    /// (a previous create failed). On rename failure the old file is reopened
    /// and the open date is kept so the next attempt retries.
    pub fn swap(&mut self, live: &Path, today: NaiveDate) -> Result<Option<PathBuf>, LogError> {
        if self.shut {
            return Err(LogError::InternalError("log file is shut down".into()));
        }

        let mut backup = None;
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
            drop(file);

            let target = backup_path(live, self.opened_on);
            if let Err(e) = fs::rename(live, &target) {
                self.file = open_append(live).ok().map(Arc::new);
                return Err(LogError::RotateFailed {
                    path: live.display().to_string(),
                    stage: "rename".into(),
                    reason: e.to_string(),
                });
            }
            backup = Some(target);
        }

        let fresh = open_append(live).map_err(|e| LogError::RotateFailed {
            path: live.display().to_string(),
            stage: "create".into(),
            reason: e.to_string(),
        })?;
        self.file = Some(Arc::new(fresh));
        self.opened_on = today;
        Ok(backup)
    }

    /// Final close. Later swaps are refused.
    pub fn shut_down(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
        }
        self.shut = true;
    }
}

/// First unused name among `<live>.<date>`, `<live>.<date>_0`, `<live>.<date>_1`, ...
pub fn backup_path(live: &Path, date: NaiveDate) -> PathBuf {
    let mut origin: OsString = live.as_os_str().to_owned();
    origin.push(".");
    origin.push(date.format(DATE_FORMAT).to_string());

    let mut candidate = PathBuf::from(&origin);
    let mut n: u32 = 0;
    while candidate.exists() {
        let mut next = origin.clone();
        next.push(format!("_{}", n));
        candidate = PathBuf::from(next);
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn append(file: &LogFile, bytes: &[u8]) {
        let handle = file.handle().expect("file is open");
        let mut out: &File = &handle;
        out.write_all(bytes).unwrap();
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn backup_name_skips_taken_suffixes() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("app.log");
        assert_eq!(backup_path(&live, day(1)), dir.path().join("app.log.2024-03-01"));

        fs::write(dir.path().join("app.log.2024-03-01"), "").unwrap();
        assert_eq!(backup_path(&live, day(1)), dir.path().join("app.log.2024-03-01_0"));

        fs::write(dir.path().join("app.log.2024-03-01_0"), "").unwrap();
        assert_eq!(backup_path(&live, day(1)), dir.path().join("app.log.2024-03-01_1"));
    }

    #[test]
    fn swap_moves_contents_and_updates_date() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("app.log");
        let mut file = LogFile::open(&live, day(1)).unwrap();
        append(&file, b"before\n");

        let backup = file.swap(&live, day(2)).unwrap().unwrap();
        assert_eq!(backup, dir.path().join("app.log.2024-03-01"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(&live).unwrap(), "");
        assert_eq!(file.opened_on(), day(2));

        append(&file, b"after\n");
        assert_eq!(fs::read_to_string(&live).unwrap(), "after\n");
    }

    #[test]
    fn failed_rename_keeps_file_open_and_date() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("app.log");
        let mut file = LogFile::open(&live, day(1)).unwrap();
        fs::remove_file(&live).unwrap();

        let err = file.swap(&live, day(2)).unwrap_err();
        assert!(matches!(err, LogError::RotateFailed { ref stage, .. } if stage == "rename"));
        assert!(file.is_open());
        assert_eq!(file.opened_on(), day(1));
    }

    #[test]
    fn swap_after_shutdown_is_refused() {
        let dir = tempdir().unwrap();
        let live = dir.path().join("app.log");
        let mut file = LogFile::open(&live, day(1)).unwrap();
        file.shut_down();
        assert!(!file.is_open());
        assert!(file.swap(&live, day(2)).is_err());
        assert!(file.handle().is_none());
    }
}
