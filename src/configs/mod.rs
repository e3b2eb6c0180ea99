use figment::{Figment, providers::{Format, Json, Toml, Env}};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::core::error::LogError;
use crate::loggers::core::{LogLevel, OutputMode};

/// Environment prefix overlaid on top of configuration files.
pub const ENV_PREFIX: &str = "DAYLOG_";

fn default_level() -> LogLevel { LogLevel::Debug }
fn default_queue_capacity() -> usize { 1024 }
fn default_scan_interval_ms() -> u64 { 300_000 }
fn default_drain_timeout_ms() -> u64 { 5_000 }
fn default_restart_on_panic() -> bool { true }

/// Logger settings. Fixed once the logger is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Directory holding the live file and its backups.
    pub path: PathBuf,
    /// Base name of the live file.
    pub name: String,
    #[serde(default)]
    pub mode: OutputMode,
    /// Entries below this level are discarded before rendering.
    #[serde(default = "default_level")]
    pub level: LogLevel,
    /// Capacity of each dispatch queue. Producers wait when it is reached.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Period of the day-boundary check.
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    /// Upper bound on how long shutdown waits for queued entries.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// Restart the writer or the monitor after a panic instead of leaving it dead.
    #[serde(default = "default_restart_on_panic")]
    pub restart_on_panic: bool,
}

impl LogConfig {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            mode: OutputMode::default(),
            level: default_level(),
            queue_capacity: default_queue_capacity(),
            scan_interval_ms: default_scan_interval_ms(),
            drain_timeout_ms: default_drain_timeout_ms(),
            restart_on_panic: default_restart_on_panic(),
        }
    }

    /// LOCAL: Merges a JSON or TOML file + DAYLOG_ env vars. Fails if file missing.
    pub fn from_file(path: &str) -> Result<Self, LogError> {
        let file = Path::new(path);
        if !file.exists() {
            return Err(LogError::ConfigError(format!("Local file not found: {}", path)));
        }

        let base = match file.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            _ => Figment::new().merge(Json::file(path)),
        };

        let config: LogConfig = base
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| LogError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LogError> {
        if self.name.trim().is_empty() {
            return Err(LogError::ConfigError("Log file name is empty".into()));
        }
        if self.queue_capacity == 0 {
            return Err(LogError::ConfigError("queue_capacity must be at least 1".into()));
        }
        if self.scan_interval_ms == 0 {
            return Err(LogError::ConfigError("scan_interval_ms must be positive".into()));
        }
        Ok(())
    }

    /// `<path>/<name>`
    pub fn live_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}
