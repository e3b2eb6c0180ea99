//! Logger bound to one inbound request.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::context::header::{new_correlation_id, CorrelationHeader};
use crate::context::Logger;
use crate::loggers::builder::DailyLogger;
use crate::loggers::core::{CallSite, LogLevel};
use crate::loggers::producer::Enqueue;

/// Separator between the request's `logid` and its `cid` in the correlation id.
pub const CID_SEPARATOR: &str = "###";

/// The parts of an inbound HTTP request the logger cares about.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub path: String,
    pub query: HashMap<String, String>,
    /// Raw `X-Forwarded-For` header value.
    pub forwarded_for: Option<String>,
}

impl RequestMeta {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_forwarded_for(mut self, value: impl Into<String>) -> Self {
        self.forwarded_for = Some(value.into());
        self
    }

    fn param(&self, key: &str) -> &str {
        self.query.get(key).map(String::as_str).unwrap_or("")
    }

    /// Client address: the first entry of `X-Forwarded-For`, empty when absent.
    pub fn caller_ip(&self) -> String {
        self.forwarded_for
            .as_deref()
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .unwrap_or_default()
    }

    /// Header for this request: `logid` from the query (or a fresh id) joined
    /// with `cid`, the path as module, geo hints and the caller address.
    pub fn header(&self) -> CorrelationHeader {
        let logid = match self.param("logid") {
            "" => new_correlation_id(),
            given => given.to_string(),
        };
        CorrelationHeader {
            correlation_id: format!("{}{}{}", logid, CID_SEPARATOR, self.param("cid")),
            module: self.path.clone(),
            lat: self.param("lat").to_string(),
            lng: self.param("lng").to_string(),
            caller_ip: self.caller_ip(),
            ..Default::default()
        }
    }
}

/// [`Logger`] writing to a [`DailyLogger`] under a fixed header.
#[derive(Clone)]
pub struct RequestLogger {
    sink: DailyLogger,
    header: CorrelationHeader,
}

impl RequestLogger {
    pub fn new(sink: DailyLogger, header: CorrelationHeader) -> Self {
        Self { sink, header }
    }

    pub fn from_request(sink: DailyLogger, meta: &RequestMeta) -> Self {
        Self::new(sink, meta.header())
    }
}

impl Logger for RequestLogger {
    fn info(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue {
        self.sink.emit(&self.header, LogLevel::Info, site, args)
    }

    fn error(&self, site: CallSite, args: fmt::Arguments<'_>) -> Enqueue {
        self.sink.emit(&self.header, LogLevel::Error, site, args)
    }

    fn tag(&self, site: CallSite, tag: &str, payload: Value) -> Enqueue {
        self.sink.tag_value(&self.header, site, tag, payload)
    }

    fn correlation_id(&self) -> &str {
        &self.header.correlation_id
    }

    fn header(&self) -> &CorrelationHeader {
        &self.header
    }
}
