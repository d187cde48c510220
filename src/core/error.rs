//! Error types for the log shipper

use std::io;

pub type Result<T> = std::result::Result<T, ShipperError>;

#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    /// Socket-level connect failure
    #[error("Failed to connect to {endpoint}: {source}")]
    ConnectError {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Socket timeout; recoverable and not counted against the retry budget
    #[error("Timed out while {operation} {endpoint}")]
    TransportTimeout { operation: String, endpoint: String },

    /// Write failed on an established connection
    #[error("Write to {endpoint} failed: {source}")]
    WriteError {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    ConfigurationError { component: String, message: String },

    /// TLS handshake rejected by either side
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShipperError {
    /// Classify a failed connect attempt.
    ///
    /// Timeouts become [`ShipperError::TransportTimeout`], everything else a
    /// [`ShipperError::ConnectError`].
    pub fn connect(endpoint: impl Into<String>, source: io::Error) -> Self {
        let endpoint = endpoint.into();
        if is_timeout(&source) {
            ShipperError::TransportTimeout {
                operation: "connecting to".to_string(),
                endpoint,
            }
        } else {
            ShipperError::ConnectError { endpoint, source }
        }
    }

    /// Classify a failed write on an established connection.
    pub fn write(endpoint: impl Into<String>, source: io::Error) -> Self {
        let endpoint = endpoint.into();
        if is_timeout(&source) {
            ShipperError::TransportTimeout {
                operation: "writing to".to_string(),
                endpoint,
            }
        } else {
            ShipperError::WriteError { endpoint, source }
        }
    }

    /// Classify a failed TLS handshake.
    ///
    /// A handshake that stalled on a socket timeout is a
    /// [`ShipperError::TransportTimeout`]; anything else stays a
    /// [`ShipperError::Tls`].
    pub fn handshake(endpoint: impl Into<String>, source: native_tls::Error) -> Self {
        let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&source);
        while let Some(err) = cause {
            if err.downcast_ref::<io::Error>().is_some_and(is_timeout) {
                return Self::handshake_timeout(endpoint);
            }
            cause = err.source();
        }
        ShipperError::Tls(source)
    }

    pub fn handshake_timeout(endpoint: impl Into<String>) -> Self {
        ShipperError::TransportTimeout {
            operation: "handshaking with".to_string(),
            endpoint: endpoint.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        ShipperError::ConfigurationError {
            component: component.into(),
            message: message.into(),
        }
    }

    /// True for socket timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ShipperError::TransportTimeout { .. })
    }

    /// True when the collector actively refused the connection.
    pub fn is_refused(&self) -> bool {
        matches!(
            self,
            ShipperError::ConnectError { source, .. }
                if source.kind() == io::ErrorKind::ConnectionRefused
        )
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_classification() {
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = ShipperError::connect("127.0.0.1:28777", refused);
        assert!(matches!(err, ShipperError::ConnectError { .. }));
        assert!(err.is_refused());
        assert!(!err.is_timeout());

        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "timed out");
        let err = ShipperError::connect("127.0.0.1:28777", timed_out);
        assert!(err.is_timeout());
        assert!(!err.is_refused());
    }

    #[test]
    fn test_write_classification() {
        let broken = io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe");
        let err = ShipperError::write("collector:514", broken);
        assert!(matches!(err, ShipperError::WriteError { .. }));

        let blocked = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        assert!(ShipperError::write("collector:514", blocked).is_timeout());
    }

    #[test]
    fn test_error_display() {
        let err = ShipperError::config("TransportConfig", "port must be non-zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for TransportConfig: port must be non-zero"
        );

        let err = ShipperError::connect(
            "10.0.0.1:28777",
            io::Error::new(io::ErrorKind::TimedOut, "timed out"),
        );
        assert_eq!(err.to_string(), "Timed out while connecting to 10.0.0.1:28777");

        let err = ShipperError::handshake_timeout("10.0.0.1:6514");
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timed out while handshaking with 10.0.0.1:6514");
    }
}
