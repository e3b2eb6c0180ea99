//! Correlation data attached to every entry.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use sysinfo::System;

static ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Per-request identifying data.
///
/// Built once by the caller (usually from inbound request metadata) and handed
/// to every producer call. The logger only reads it; the zero value is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationHeader {
    pub correlation_id: String,
    pub request_id: String,
    pub host_id: String,
    pub caller_ip: String,
    pub host_ip: String,
    pub product: String,
    pub module: String,
    pub lat: String,
    pub lng: String,
}

impl CorrelationHeader {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            ..Default::default()
        }
    }

    /// Header with `host_id` prefilled from the machine host name.
    pub fn local() -> Self {
        Self {
            host_id: System::host_name().unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_host_id(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = host_id.into();
        self
    }

    pub fn with_caller_ip(mut self, caller_ip: impl Into<String>) -> Self {
        self.caller_ip = caller_ip.into();
        self
    }

    pub fn with_host_ip(mut self, host_ip: impl Into<String>) -> Self {
        self.host_ip = host_ip.into();
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }
}

/// Fresh 24 hex character id: 4 bytes of unix seconds, 5 random bytes and a
/// 3 byte process-wide counter. Ids sort roughly by creation time.
pub fn new_correlation_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp() as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill(&mut bytes[4..9]);
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    bytes[9..].copy_from_slice(&n.to_be_bytes()[1..]);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_hex_and_unique() {
        let a = new_correlation_id();
        let b = new_correlation_id();
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn builder_sets_fields() {
        let h = CorrelationHeader::new("abc")
            .with_request_id("r1")
            .with_host_id("h1")
            .with_module("/users");
        assert_eq!(h.correlation_id, "abc");
        assert_eq!(h.request_id, "r1");
        assert_eq!(h.host_id, "h1");
        assert_eq!(h.module, "/users");
        assert!(h.caller_ip.is_empty());
    }

    #[test]
    fn local_header_only_fills_host() {
        let h = CorrelationHeader::local();
        assert_eq!(h.host_id, System::host_name().unwrap_or_default());
        assert!(h.correlation_id.is_empty());
    }
}
