//! Rendering of entries into the two on-disk shapes.

use serde_json::Value;

use crate::context::header::CorrelationHeader;
use crate::loggers::core::{CallSite, LogLevel, LogRecord, Trace};

/// `[file.rs:42][INFO] [cid][rid][hid] MSG:message`
pub fn plain_line(
    header: &CorrelationHeader,
    level: LogLevel,
    site: CallSite,
    message: &str,
) -> String {
    format!(
        "[{}:{}][{}] [{}][{}][{}] MSG:{}",
        site.short_file(),
        site.line,
        level.as_str(),
        header.correlation_id,
        header.request_id,
        header.host_id,
        message
    )
}

/// Builds a structured record. `tag` is empty for non-tag entries.
pub fn record(
    header: &CorrelationHeader,
    level: LogLevel,
    site: CallSite,
    timestamp: i64,
    msg: Value,
    tag: &str,
) -> LogRecord {
    LogRecord {
        timestamp,
        level,
        logid: header.correlation_id.clone(),
        product: header.product.clone(),
        module: header.module.clone(),
        caller_ip: header.caller_ip.clone(),
        host_ip: header.host_ip.clone(),
        msg,
        trace: Trace {
            file: site.short_file().to_string(),
            line: site.line,
        },
        tag: tag.to_string(),
    }
}

/// Payload text for a tag entry in plain mode: strings stay bare, everything
/// else is compact JSON.
pub fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
