//! Side channel for failures of the logger itself.
//!
//! Anything reported here never goes through the log queues, so a broken
//! file or a full queue cannot recurse back into the logger.

use std::fmt;

pub fn report(args: fmt::Arguments<'_>) {
    eprintln!("[rs_daylog] {}", args);
}
