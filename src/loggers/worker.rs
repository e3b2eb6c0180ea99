use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write as _};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task;

use crate::core::diag;
use crate::loggers::builder::Shared;
use crate::loggers::core::LogRecord;

/// Line header of plain mode: local time with microseconds.
pub const PLAIN_STAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

/// Receiving ends of the dispatch queues. Kept behind a mutex so a restarted
/// writer picks up where a panicked one stopped.
pub(crate) struct Inbox {
    lines: mpsc::Receiver<String>,
    records: mpsc::Receiver<LogRecord>,
}

impl Inbox {
    pub(crate) fn new(lines: mpsc::Receiver<String>, records: mpsc::Receiver<LogRecord>) -> Self {
        Self { lines, records }
    }
}

/// The single task that moves entries from the queues into the file.
pub(crate) struct LogWorker {
    shared: Arc<Shared>,
    inbox: Arc<Mutex<Inbox>>,
    stop: watch::Receiver<bool>,
}

impl LogWorker {
    pub(crate) fn new(
        shared: Arc<Shared>,
        inbox: Arc<Mutex<Inbox>>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self { shared, inbox, stop }
    }

    pub(crate) async fn run(self) {
        let LogWorker { shared, inbox, mut stop } = self;
        let mut guard = inbox.lock().await;
        let Inbox { lines, records } = &mut *guard;

        if !*stop.borrow() {
            loop {
                tokio::select! {
                    Some(line) = lines.recv() => write_line(&shared, line).await,
                    Some(record) = records.recv() => write_record(&shared, record).await,
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                    else => break,
                }
            }
        }

        // No new entries from here on; everything already queued is written.
        lines.close();
        records.close();
        while let Some(line) = lines.recv().await {
            write_line(&shared, line).await;
        }
        while let Some(record) = records.recv().await {
            write_record(&shared, record).await;
        }
    }
}

/// Marks one dequeued entry as finished when dropped, including on unwind,
/// so a writer panic cannot leave `flush()` waiting forever.
pub(crate) struct EntryDone<'a>(&'a Shared);

impl<'a> EntryDone<'a> {
    pub(crate) fn new(shared: &'a Shared) -> Self {
        Self(shared)
    }
}

impl Drop for EntryDone<'_> {
    fn drop(&mut self) {
        self.0.finish_entry();
    }
}

async fn write_line(shared: &Shared, line: String) {
    let _done = EntryDone::new(shared);
    let mut out = String::with_capacity(line.len() + 28);
    let _ = write!(out, "{} ", shared.clock.now().format(PLAIN_STAMP_FORMAT));
    out.push_str(&line);
    out.push('\n');
    write_bytes(shared, out.into_bytes()).await;
}

async fn write_record(shared: &Shared, record: LogRecord) {
    let _done = EntryDone::new(shared);
    match serde_json::to_string(&record) {
        Ok(mut json) => {
            json.push('\n');
            write_bytes(shared, json.into_bytes()).await;
        }
        Err(e) => diag::report(format_args!("dropping record {}: {}", record.logid, e)),
    }
}

/// Writes on the blocking pool while holding the shared lock, so rotation
/// still waits for the write to land and a slow disk never stalls a runtime
/// worker.
async fn write_bytes(shared: &Shared, bytes: Vec<u8>) {
    let file = shared.file.read().await;
    let result = match file.handle() {
        Some(handle) => task::spawn_blocking(move || {
            let mut out: &File = &handle;
            out.write_all(&bytes)
        })
        .await
        .unwrap_or_else(|e| Err(io::Error::other(e))),
        None => Err(io::Error::new(io::ErrorKind::NotConnected, "log file is closed")),
    };
    drop(file);

    if let Err(e) = result {
        diag::report(format_args!("write to {} failed: {}", shared.live_path.display(), e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::builder::LoggerBuilder;
    use std::panic::{self, AssertUnwindSafe};
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn entry_is_finished_even_when_writing_panics() {
        let dir = tempdir().unwrap();
        let logger = LoggerBuilder::new(dir.path(), "app.log").build().unwrap();
        let shared = logger.shared.clone();

        shared.begin_entry();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _done = EntryDone::new(&shared);
            panic!("writer blew up mid-entry");
        }));
        assert!(outcome.is_err());

        tokio::time::timeout(Duration::from_secs(1), logger.flush())
            .await
            .expect("flush returns once the entry is accounted for");
    }
}
