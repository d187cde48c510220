//! Fire-and-forget datagram appender
//!
//! Sends each formatted line as one UDP datagram. There is no connection to
//! manage, so nothing is queued or retried: a failed send is reported to the
//! observer and the event is gone.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::appenders::socket::{LogObserver, TransportEvent, TransportObserver};
use crate::core::{
    Appender, DeliveryCallback, LineFormatter, LogEvent, LogLevel, Metadata, Result, ShipperError,
    TransportConfig, TransportMetrics,
};

pub struct DatagramAppender {
    socket: UdpSocket,
    target: SocketAddr,
    formatter: LineFormatter,
    observer: Arc<dyn TransportObserver>,
    metrics: TransportMetrics,
    closed: AtomicBool,
}

impl DatagramAppender {
    /// Resolve the collector address and bind a local socket.
    ///
    /// # Errors
    ///
    /// Invalid configuration, an unresolvable host, or failure to bind.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// Like [`DatagramAppender::new`], reporting send failures to `observer`.
    pub fn with_observer(
        config: TransportConfig,
        observer: Arc<dyn TransportObserver>,
    ) -> Result<Self> {
        config.validate()?;
        let target = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| {
                ShipperError::config(
                    "DatagramAppender",
                    format!("cannot resolve {}: {}", config.endpoint(), e),
                )
            })?
            .next()
            .ok_or_else(|| {
                ShipperError::config(
                    "DatagramAppender",
                    format!("no addresses for {}", config.endpoint()),
                )
            })?;
        let bind_addr = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            target,
            formatter: LineFormatter::new(&config),
            observer,
            metrics: TransportMetrics::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Send one event; `callback` runs after the send attempt.
    pub fn log(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        metadata: Metadata,
        callback: Option<DeliveryCallback>,
    ) {
        if self.closed.load(Ordering::Acquire) {
            self.metrics.record_discarded(1);
        } else {
            match self.formatter.format(level, message.as_ref(), metadata) {
                Ok(line) => self.send(&line),
                Err(error) => self
                    .observer
                    .on_event(&TransportEvent::FormatFailed { error: &error }),
            }
        }
        if let Some(callback) = callback {
            callback();
        }
        self.observer.on_event(&TransportEvent::Logged);
    }

    fn send(&self, line: &str) {
        match self.socket.send_to(line.as_bytes(), self.target) {
            Ok(_) => {
                self.metrics.record_sent();
            }
            Err(err) => {
                let error = ShipperError::write(self.target.to_string(), err);
                self.metrics.record_write_failure();
                if error.is_timeout() {
                    self.metrics.record_timeout();
                }
                self.observer
                    .on_event(&TransportEvent::WriteFailed { error: &error });
            }
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }
}

impl Appender for DatagramAppender {
    fn append(&self, event: LogEvent) {
        self.log(event.level, &event.message, event.metadata, None);
    }

    fn close(&self) {
        DatagramAppender::close(self);
    }

    fn name(&self) -> &str {
        "datagram"
    }
}
