//! Core transport types and traits

pub mod appender;
pub mod config;
pub mod error;
pub mod formatter;
pub mod log_event;
pub mod log_level;
pub mod metrics;
pub mod syslog;

pub use appender::{Appender, DeliveryCallback};
pub use config::{
    Facility, PemSource, TlsMaterial, TransportConfig, TransportKind, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_HOST, DEFAULT_MAX_CONNECT_RETRIES, DEFAULT_PORT, DEFAULT_RETRY_DELAY,
};
pub use error::{Result, ShipperError};
pub use formatter::{strip_ansi, FormattedLine, LineFormatter};
pub use log_event::{LogEvent, Metadata};
pub use log_level::LogLevel;
pub use metrics::TransportMetrics;
pub use syslog::{SyslogFormat, SyslogProducer};
