//! # Request Context
//!
//! The narrow logging capability handed to request handlers and clients.
//! A [`Logger`] is bound to one [`CorrelationHeader`], so callers only supply
//! the message.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::core::diag;
use crate::loggers::core::CallSite;
use crate::loggers::producer::Enqueue;

pub mod capture;
pub mod header;
pub mod request;

pub use capture::CaptureLogger;
pub use header::{new_correlation_id, CorrelationHeader};
pub use request::{RequestLogger, RequestMeta};

/// Logging capability bound to a correlation header.
pub trait Logger: Send + Sync {
    fn info(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue;

    fn error(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue;

    fn tag(&self, site: CallSite, tag: &str, payload: Value) -> Enqueue;

    fn correlation_id(&self) -> &str;

    fn header(&self) -> &CorrelationHeader;
}

/// Conveniences available on every [`Logger`], including `dyn Logger`.
pub trait LoggerExt: Logger {
    /// Serializes `payload` and records it under `tag`. A payload that cannot be
    /// serialized is reported on the side channel and dropped.
    fn tag_serialized<T: Serialize + ?Sized>(
        &self,
        site: CallSite,
        tag: &str,
        payload: &T,
    ) -> Enqueue {
        match serde_json::to_value(payload) {
            Ok(value) => self.tag(site, tag, value),
            Err(e) => {
                diag::report(format_args!("dropping tag {}: payload not serializable: {}", tag, e));
                Box::pin(std::future::ready(()))
            }
        }
    }
}

impl<L: Logger + ?Sized> LoggerExt for L {}

#[macro_export]
macro_rules! record_info {
    ($logger:expr, $($arg:tt)+) => {
        {
            use $crate::context::Logger as _;
            let pending = $logger.info($crate::call_site!(), format_args!($($arg)+));
            pending.await
        }
    };
}

#[macro_export]
macro_rules! record_error {
    ($logger:expr, $($arg:tt)+) => {
        {
            use $crate::context::Logger as _;
            let pending = $logger.error($crate::call_site!(), format_args!($($arg)+));
            pending.await
        }
    };
}

/// `record_tag!(logger, "name", payload)` where payload is any `Serialize` value.
#[macro_export]
macro_rules! record_tag {
    ($logger:expr, $tag:expr, $payload:expr) => {
        {
            use $crate::context::LoggerExt as _;
            let pending = $logger.tag_serialized($crate::call_site!(), $tag, &$payload);
            pending.await
        }
    };
}
