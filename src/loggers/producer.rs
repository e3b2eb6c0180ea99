//! Producer side: level gate, rendering and enqueue.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::error::TrySendError;

use crate::context::header::CorrelationHeader;
use crate::core::diag;
use crate::loggers::builder::{DailyLogger, Shared};
use crate::loggers::core::{CallSite, LogLevel, LogRecord, OutputMode};
use crate::loggers::format;

/// Completes once the entry sits in its queue. Only waits while the queue is full.
pub type Enqueue = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(crate) enum Entry {
    Line(String),
    Record(LogRecord),
}

fn done() -> Enqueue {
    Box::pin(future::ready(()))
}

impl DailyLogger {
    /// Renders and enqueues one entry. Below the configured level nothing is
    /// rendered and the returned future is already complete.
    ///
    /// The rendering happens before this returns, so the future borrows nothing.
    pub fn emit(
        &self,
        header: &CorrelationHeader,
        level: LogLevel,
        site: CallSite,
        args: fmt::Arguments<'_>,
    ) -> Enqueue {
        if !self.enabled(level) {
            return done();
        }
        let msg = Value::String(args.to_string());
        let entry = self.shared.render(header, level, site, msg, "");
        self.shared.clone().enqueue(entry)
    }

    /// INFO entry whose message is an arbitrary payload and which carries no
    /// tag. In plain mode the payload is rendered as compact JSON.
    pub fn info_json<T: Serialize + ?Sized>(
        &self,
        header: &CorrelationHeader,
        site: CallSite,
        payload: &T,
    ) -> Enqueue {
        self.tag(header, site, "", payload)
    }

    pub fn info_value(
        &self,
        header: &CorrelationHeader,
        site: CallSite,
        payload: Value,
    ) -> Enqueue {
        self.tag_value(header, site, "", payload)
    }

    /// Enqueues an arbitrary payload under `tag` at INFO level.
    pub fn tag<T: Serialize + ?Sized>(
        &self,
        header: &CorrelationHeader,
        site: CallSite,
        tag: &str,
        payload: &T,
    ) -> Enqueue {
        if !self.enabled(LogLevel::Info) {
            return done();
        }
        match serde_json::to_value(payload) {
            Ok(value) => self.tag_value(header, site, tag, value),
            Err(e) => {
                diag::report(format_args!(
                    "dropping tag {:?}: payload not serializable: {}",
                    tag, e
                ));
                done()
            }
        }
    }

    pub fn tag_value(
        &self,
        header: &CorrelationHeader,
        site: CallSite,
        tag: &str,
        payload: Value,
    ) -> Enqueue {
        if !self.enabled(LogLevel::Info) {
            return done();
        }
        let entry = self.shared.render(header, LogLevel::Info, site, payload, tag);
        self.shared.clone().enqueue(entry)
    }
}

impl Shared {
    pub(crate) fn render(
        &self,
        header: &CorrelationHeader,
        level: LogLevel,
        site: CallSite,
        msg: Value,
        tag: &str,
    ) -> Entry {
        match self.config.mode {
            OutputMode::Plain => {
                let text = format::payload_text(&msg);
                Entry::Line(format::plain_line(header, level, site, &text))
            }
            OutputMode::Structured => {
                let ts = self.clock.now().timestamp();
                Entry::Record(format::record(header, level, site, ts, msg, tag))
            }
        }
    }

    fn enqueue(self: std::sync::Arc<Self>, entry: Entry) -> Enqueue {
        Box::pin(async move {
            self.begin_entry();
            let sent = match entry {
                Entry::Line(line) => self.lines.send(line).await.is_ok(),
                Entry::Record(record) => self.records.send(record).await.is_ok(),
            };
            if !sent {
                self.finish_entry();
            }
        })
    }

    /// Enqueues without waiting. Used by the logger's own tasks, which must
    /// never block on a queue the writer may be unable to drain.
    pub(crate) fn try_enqueue(&self, entry: Entry) {
        self.begin_entry();
        let rejected = match entry {
            Entry::Line(line) => self.lines.try_send(line).err().map(|e| match e {
                TrySendError::Full(v) | TrySendError::Closed(v) => v,
            }),
            Entry::Record(record) => self.records.try_send(record).err().map(|e| match e {
                TrySendError::Full(r) | TrySendError::Closed(r) => r.msg.to_string(),
            }),
        };
        if let Some(text) = rejected {
            self.finish_entry();
            diag::report(format_args!("queue unavailable, dropped: {}", text));
        }
    }

    /// Reports a failure of the logger through its own queue.
    pub(crate) fn report_internal(&self, site: CallSite, message: String) {
        if self.closed.load(Ordering::Acquire) {
            diag::report(format_args!("{}", message));
            return;
        }
        let header = CorrelationHeader::default();
        let entry = self.render(&header, LogLevel::Error, site, Value::String(message), "");
        self.try_enqueue(entry);
    }

    pub(crate) fn begin_entry(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn finish_entry(&self) {
        let prev = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        if prev <= 1 {
            self.idle.notify_waiters();
        }
    }
}
