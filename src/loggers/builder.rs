use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex, Notify, RwLock, RwLockWriteGuard};
use tokio::task::JoinHandle;

use crate::configs::LogConfig;
use crate::core::diag;
use crate::core::error::LogError;
use crate::loggers::clock::{Clock, SystemClock};
use crate::loggers::core::{LogLevel, LogRecord, OutputMode};
use crate::loggers::file::LogFile;
use crate::loggers::rotation::RotationMonitor;
use crate::loggers::supervisor::supervise;
use crate::loggers::worker::{Inbox, LogWorker};

/// State shared by the handle, the writer task and the rotation monitor.
pub(crate) struct Shared {
    pub(crate) config: LogConfig,
    pub(crate) live_path: PathBuf,
    pub(crate) clock: Arc<dyn Clock>,
    /// Readers: the writer. Sole writer: rotation and shutdown.
    pub(crate) file: RwLock<LogFile>,
    pub(crate) lines: mpsc::Sender<String>,
    pub(crate) records: mpsc::Sender<LogRecord>,
    /// Entries accepted by a producer but not yet written.
    pub(crate) pending: AtomicUsize,
    pub(crate) idle: Notify,
    pub(crate) closed: AtomicBool,
    pub(crate) stop: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to a running daily-rotating logger.
///
/// Cheap to clone; every clone feeds the same queues and the same file.
/// Build one per process with [`LoggerBuilder`] and pass it to whatever needs it.
#[derive(Clone)]
pub struct DailyLogger {
    pub(crate) shared: Arc<Shared>,
}

impl DailyLogger {
    pub fn config(&self) -> &LogConfig {
        &self.shared.config
    }

    pub fn mode(&self) -> OutputMode {
        self.shared.config.mode
    }

    /// Full path of the live file.
    pub fn live_path(&self) -> &std::path::Path {
        &self.shared.live_path
    }

    /// Whether an entry at `level` would be written.
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.shared.config.level && !self.shared.closed.load(Ordering::Acquire)
    }

    /// Waits until every entry enqueued so far has reached the file.
    pub async fn flush(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Rejects new entries, drains what is queued (bounded by the configured
    /// drain timeout), stops both background tasks and closes the file.
    ///
    /// Calling it again is a no-op.
    pub async fn shutdown(&self) -> Result<(), LogError> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shared.stop.send_replace(true);

        let tasks = self
            .shared
            .tasks
            .lock()
            .map(|mut t| std::mem::take(&mut *t))
            .unwrap_or_default();

        let limit = self.shared.config.drain_timeout();
        let drained = tokio::time::timeout(limit, async {
            for task in tasks {
                let _ = task.await;
            }
        })
        .await;

        if drained.is_err() {
            // Whatever is still queued is lost; release anyone blocked in flush().
            self.shared.pending.store(0, Ordering::Release);
            self.shared.idle.notify_waiters();
        }

        if let Err(e) = self.shared.with_file_exclusive(|file| file.shut_down()).await {
            diag::report(format_args!("closing {}: {}", self.shared.live_path.display(), e));
        }

        match drained {
            Ok(()) => Ok(()),
            Err(_) => Err(LogError::DrainTimeout {
                waited_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Takes the exclusive file lock and keeps it until the returned guard is
    /// dropped. The writer stalls on its next entry; rotation and shutdown
    /// wait behind it.
    #[doc(hidden)]
    pub async fn hold_writes(&self) -> WriteHold<'_> {
        WriteHold {
            _guard: self.shared.file.write().await,
        }
    }
}

/// Exclusive hold on the live file, see [`DailyLogger::hold_writes`].
#[doc(hidden)]
pub struct WriteHold<'a> {
    _guard: RwLockWriteGuard<'a, LogFile>,
}

impl Shared {
    /// Runs `op` on the blocking pool with the exclusive lock held.
    ///
    /// The file is moved out for the call and a detached placeholder with the
    /// same open date sits behind the lock meanwhile.
    pub(crate) async fn with_file_exclusive<F, R>(&self, op: F) -> Result<R, LogError>
    where
        F: FnOnce(&mut LogFile) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut guard = self.file.write().await;
        let placeholder = LogFile::detached(guard.opened_on());
        let mut current = std::mem::replace(&mut *guard, placeholder);

        let (current, out) = tokio::task::spawn_blocking(move || {
            let out = op(&mut current);
            (current, out)
        })
        .await
        .map_err(|e| LogError::InternalError(format!("file task failed: {}", e)))?;

        *guard = current;
        Ok(out)
    }
}

pub struct LoggerBuilder {
    config: LogConfig,
    clock: Arc<dyn Clock>,
}

impl LoggerBuilder {
    /// Logger writing `<path>/<name>`, plain mode, DEBUG and above.
    pub fn new(path: impl Into<PathBuf>, name: &str) -> Self {
        Self::from_config(LogConfig::new(path, name))
    }

    pub fn from_config(config: LogConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn with_mode(mut self, mode: OutputMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn with_scan_interval(mut self, every: Duration) -> Self {
        self.config.scan_interval_ms = every.as_millis() as u64;
        self
    }

    pub fn with_drain_timeout(mut self, limit: Duration) -> Self {
        self.config.drain_timeout_ms = limit.as_millis() as u64;
        self
    }

    pub fn with_restart_on_panic(mut self, restart: bool) -> Self {
        self.config.restart_on_panic = restart;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Opens the live file and starts the writer and the rotation monitor.
    ///
    /// Must be called from inside a tokio runtime. Fails if the directory or
    /// the live file cannot be created.
    pub fn build(self) -> Result<DailyLogger, LogError> {
        let config = self.config;
        config.validate()?;

        let live_path = config.live_path();
        let open_failed = |e: std::io::Error| LogError::OpenFailed {
            path: live_path.display().to_string(),
            reason: e.to_string(),
        };
        std::fs::create_dir_all(&config.path).map_err(open_failed)?;
        let file = LogFile::open(&live_path, self.clock.today()).map_err(open_failed)?;

        let (line_tx, line_rx) = mpsc::channel(config.queue_capacity);
        let (record_tx, record_rx) = mpsc::channel(config.queue_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let restart = config.restart_on_panic;

        let shared = Arc::new(Shared {
            config,
            live_path,
            clock: self.clock,
            file: RwLock::new(file),
            lines: line_tx,
            records: record_tx,
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            closed: AtomicBool::new(false),
            stop: stop_tx,
            tasks: Mutex::new(Vec::new()),
        });

        let inbox = Arc::new(AsyncMutex::new(Inbox::new(line_rx, record_rx)));

        let writer = {
            let shared = shared.clone();
            let stop = stop_rx.clone();
            supervise("writer", restart, move || {
                LogWorker::new(shared.clone(), inbox.clone(), stop.clone()).run()
            })
        };
        let monitor = {
            let shared = shared.clone();
            supervise("rotation monitor", restart, move || {
                RotationMonitor::new(shared.clone(), stop_rx.clone()).run()
            })
        };

        if let Ok(mut tasks) = shared.tasks.lock() {
            tasks.push(writer);
            tasks.push(monitor);
        }

        Ok(DailyLogger { shared })
    }
}
