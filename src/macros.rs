//! Logging macros for shipping formatted messages.
//!
//! These macros format their arguments like `format!` and hand the result to
//! any appender exposing a `log(level, message, metadata, callback)` method,
//! such as [`SocketAppender`](crate::SocketAppender) or
//! [`DatagramAppender`](crate::DatagramAppender).
//!
//! # Examples
//!
//! ```
//! use log_shipper::prelude::*;
//! use log_shipper::ship_info;
//!
//! let appender = DatagramAppender::new(TransportConfig::new("127.0.0.1", 5140)).unwrap();
//!
//! ship_info!(appender, "Server started");
//!
//! let port = 8080;
//! ship_info!(appender, "Server listening on port {}", port);
//!
//! // Metadata goes first, before the format string
//! ship_info!(appender, meta = Metadata::empty().with_field("port", port), "listening");
//! ```

/// Ship a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use log_shipper::prelude::*;
/// # let appender = DatagramAppender::new(TransportConfig::new("127.0.0.1", 5140)).unwrap();
/// use log_shipper::ship;
/// ship!(appender, LogLevel::Notice, "Simple message");
/// ship!(appender, LogLevel::Error, "Error code: {}", 500);
/// ship!(appender, LogLevel::Error, meta = Metadata::empty().with_field("code", 500), "failed");
/// ```
#[macro_export]
macro_rules! ship {
    ($appender:expr, $level:expr, meta = $meta:expr, $($arg:tt)+) => {
        $appender.log($level, format!($($arg)+), $meta, None)
    };
    ($appender:expr, $level:expr, $($arg:tt)+) => {
        $appender.log($level, format!($($arg)+), $crate::Metadata::empty(), None)
    };
}

/// Ship a debug-level message.
#[macro_export]
macro_rules! ship_debug {
    ($appender:expr, $($arg:tt)+) => {
        $crate::ship!($appender, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Ship an info-level message.
#[macro_export]
macro_rules! ship_info {
    ($appender:expr, $($arg:tt)+) => {
        $crate::ship!($appender, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Ship a warn-level message.
///
/// # Examples
///
/// ```
/// # use log_shipper::prelude::*;
/// # let appender = DatagramAppender::new(TransportConfig::new("127.0.0.1", 5140)).unwrap();
/// use log_shipper::ship_warn;
/// ship_warn!(appender, "Disk usage at {}%", 91);
/// ```
#[macro_export]
macro_rules! ship_warn {
    ($appender:expr, $($arg:tt)+) => {
        $crate::ship!($appender, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Ship an error-level message.
///
/// # Examples
///
/// ```
/// # use log_shipper::prelude::*;
/// # let appender = DatagramAppender::new(TransportConfig::new("127.0.0.1", 5140)).unwrap();
/// use log_shipper::ship_error;
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
/// ship_error!(appender, meta = Metadata::from_error(&err), "write failed");
/// ```
#[macro_export]
macro_rules! ship_error {
    ($appender:expr, $($arg:tt)+) => {
        $crate::ship!($appender, $crate::LogLevel::Error, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    #[test]
    fn test_macros_format_and_attach_metadata() {
        let collector = UdpSocket::bind("127.0.0.1:0").unwrap();
        collector
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = collector.local_addr().unwrap().port();
        let appender = DatagramAppender::new(
            TransportConfig::new("127.0.0.1", port)
                .with_program("svc")
                .with_local_label("box"),
        )
        .unwrap();

        ship_warn!(appender, "retry {} of {}", 2, 3);
        ship_error!(appender, meta = Metadata::empty().with_field("code", 7), "boom");

        let mut buf = [0u8; 1024];
        let len = collector.recv(&mut buf).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf[..len]).unwrap(),
            r#"{"program":"svc","host":"box","level":"warn","message":"retry 2 of 3","meta":{}}"#
        );
        let len = collector.recv(&mut buf).unwrap();
        assert_eq!(
            std::str::from_utf8(&buf[..len]).unwrap(),
            r#"{"program":"svc","host":"box","level":"error","message":"boom","meta":{"code":7}}"#
        );
    }
}
