//! Appender implementations

pub mod datagram;
pub mod socket;

pub use datagram::DatagramAppender;
pub use socket::{
    ConnectionState, LogObserver, SocketAppender, TransportEvent, TransportObserver,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
