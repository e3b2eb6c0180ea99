//! In-memory [`Logger`] for tests of code that takes a logger.

use serde_json::Value;
use std::fmt;
use std::future;
use std::sync::Mutex;

use crate::context::header::CorrelationHeader;
use crate::context::Logger;
use crate::loggers::core::{CallSite, LogLevel};
use crate::loggers::format;
use crate::loggers::producer::Enqueue;

/// Keeps every entry as a rendered plain line, in call order.
#[derive(Debug)]
pub struct CaptureLogger {
    header: CorrelationHeader,
    lines: Mutex<Vec<String>>,
}

impl Default for CaptureLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureLogger {
    pub fn new() -> Self {
        Self {
            header: CorrelationHeader::new("test"),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, level: LogLevel, site: CallSite, message: &str) -> Enqueue {
        let line = format::plain_line(&self.header, level, site, message);
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
        Box::pin(future::ready(()))
    }
}

impl Logger for CaptureLogger {
    fn info(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue {
        self.push(LogLevel::Info, site, &args.to_string())
    }

    fn error(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue {
        self.push(LogLevel::Error, site, &args.to_string())
    }

    fn tag(&self, site: CallSite, tag: &str, payload: Value) -> Enqueue {
        self.push(LogLevel::Info, site, &format!("{} {}", tag, format::payload_text(&payload)))
    }

    fn correlation_id(&self) -> &str {
        &self.header.correlation_id
    }

    fn header(&self) -> &CorrelationHeader {
        &self.header
    }
}
