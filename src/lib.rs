//! # Log Shipper
//!
//! Ships log events to a remote collector over TCP, TLS, or UDP.
//!
//! ## Features
//!
//! - **Never blocks, never fails**: logging calls return immediately and
//!   transport errors go to a [`TransportObserver`], not the caller
//! - **Ordered buffering**: events logged while disconnected are flushed in
//!   order once the collector is reachable
//! - **Bounded retries**: a fixed reconnect delay, then silent mode
//! - **Wire formats**: a JSON envelope, RFC 5424, or RFC 3164 syslog

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{
        ConnectionState, DatagramAppender, LogObserver, SocketAppender, TransportEvent,
        TransportObserver, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::core::{
        Appender, DeliveryCallback, Facility, LogEvent, LogLevel, Metadata, PemSource, Result,
        ShipperError, TlsMaterial, TransportConfig, TransportKind, TransportMetrics,
    };
}

pub use appenders::{
    ConnectionState, DatagramAppender, LogObserver, SocketAppender, TransportEvent,
    TransportObserver, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use core::{
    Appender, DeliveryCallback, Facility, LineFormatter, LogEvent, LogLevel, Metadata, PemSource,
    Result, ShipperError, TlsMaterial, TransportConfig, TransportKind, TransportMetrics,
};
