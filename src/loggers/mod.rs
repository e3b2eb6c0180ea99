// src/loggers/mod.rs

pub mod builder;
pub mod clock;
pub mod core;
pub mod file;
pub mod format;
pub mod producer;
pub mod rotation;
mod supervisor;
pub mod worker;

pub use builder::{DailyLogger, LoggerBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use self::core::{CallSite, LogLevel, LogRecord, OutputMode, Trace};
pub use producer::Enqueue;

/// Source location of the macro invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::loggers::core::CallSite::new(file!(), line!())
    };
}

#[macro_export]
macro_rules! log_base {
    ($logger:expr, $header:expr, $level:expr, $($arg:tt)+) => {
        {
            // Bound first so the format_args! temporaries are gone before the await.
            let site = $crate::call_site!();
            let pending = $logger.emit(&$header, $level, site, format_args!($($arg)+));
            pending.await
        }
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $header:expr, $($arg:tt)+) => {
        $crate::log_base!($logger, $header, $crate::loggers::core::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $header:expr, $($arg:tt)+) => {
        $crate::log_base!($logger, $header, $crate::loggers::core::LogLevel::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $header:expr, $($arg:tt)+) => {
        $crate::log_base!($logger, $header, $crate::loggers::core::LogLevel::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $header:expr, $($arg:tt)+) => {
        $crate::log_base!($logger, $header, $crate::loggers::core::LogLevel::Error, $($arg)+)
    };
}

/// `tag!(logger, header, "name", payload)` where payload is any `Serialize` value.
#[macro_export]
macro_rules! tag {
    ($logger:expr, $header:expr, $tag:expr, $payload:expr) => {
        {
            let pending = $logger.tag(&$header, $crate::call_site!(), $tag, &$payload);
            pending.await
        }
    };
}

/// `info_json!(logger, header, payload)`: INFO entry with a `Serialize` payload
/// as its message and no tag.
#[macro_export]
macro_rules! info_json {
    ($logger:expr, $header:expr, $payload:expr) => {
        {
            let pending = $logger.info_json(&$header, $crate::call_site!(), &$payload);
            pending.await
        }
    };
}
