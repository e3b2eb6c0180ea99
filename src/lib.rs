
pub mod core;
pub mod configs;
pub mod context;
pub mod loggers;

pub use crate::core::error::LogError;
pub use configs::LogConfig;
pub use context::{CorrelationHeader, Logger};
pub use loggers::{DailyLogger, LoggerBuilder};
