//! Persistent stream appender for remote collectors
//!
//! [`SocketAppender`] ships newline-delimited records over TCP or TLS. The
//! connection is owned by a manager thread that connects, buffers while the
//! collector is unreachable, flushes in order once it is back, retries after
//! a fixed delay, and goes silent after `max_connect_retries` failed
//! reconnects. Logging never blocks on the network and never reports an
//! error to the caller; problems surface through a [`TransportObserver`].

mod connection;
mod manager;
mod observer;
mod queue;
mod state;


pub use connection::{Connection, Connector, SocketConnector};
pub use observer::{LogObserver, TransportEvent, TransportObserver};
pub use queue::{PendingQueue, QueueEntry};
pub use state::ConnectionState;

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, SendError};
use parking_lot::Mutex;

use crate::core::{
    Appender, DeliveryCallback, LineFormatter, LogEvent, LogLevel, Metadata, Result,
    TransportConfig, TransportMetrics,
};

use manager::{Command, ConnectionManager, Core};

/// Default time [`SocketAppender::shutdown`] callers typically allow.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Network appender keeping a long-lived connection to a collector
///
/// # Example
///
/// ```no_run
/// use log_shipper::prelude::*;
///
/// let config = TransportConfig::new("logs.internal", 5140).with_kind(TransportKind::Rfc5424);
/// let appender = SocketAppender::new(config).expect("valid configuration");
///
/// appender.log(LogLevel::Info, "service started", Metadata::empty(), None);
/// appender.close();
/// ```
pub struct SocketAppender {
    core: Arc<Core>,
    formatter: LineFormatter,
    done: Receiver<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SocketAppender {
    /// Validate `config`, load TLS material, and start connecting.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings or unusable TLS
    /// material. Network failures are never construction errors.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// Like [`SocketAppender::new`], reporting transport events to `observer`
    /// instead of the `log` facade.
    pub fn with_observer(
        config: TransportConfig,
        observer: Arc<dyn TransportObserver>,
    ) -> Result<Self> {
        let connector = SocketConnector::from_config(&config)?;
        Self::with_connector(config, connector, observer)
    }

    /// Start a transport on a custom [`Connector`].
    pub fn with_connector<C: Connector>(
        config: TransportConfig,
        connector: C,
        observer: Arc<dyn TransportObserver>,
    ) -> Result<Self> {
        config.validate()?;
        let (commands, receiver) = unbounded();
        let (done_tx, done) = bounded(1);
        let core = Arc::new(Core::new(commands, observer, connector.endpoint()));
        let manager =
            ConnectionManager::new(Arc::clone(&core), receiver, connector, &config, done_tx);
        let worker = manager.spawn()?;

        Ok(Self {
            core,
            formatter: LineFormatter::new(&config),
            done,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Ship one event.
    ///
    /// The event is formatted on the calling thread, then written by the
    /// manager if connected, queued otherwise, or discarded in silent mode.
    /// `callback` runs once the line has been handed over; it never signals
    /// an error.
    pub fn log(
        &self,
        level: LogLevel,
        message: impl AsRef<str>,
        metadata: Metadata,
        callback: Option<DeliveryCallback>,
    ) {
        match self.formatter.format(level, message.as_ref(), metadata) {
            Ok(line) => self.dispatch(QueueEntry::new(line, callback)),
            Err(error) => {
                self.core.notify(TransportEvent::FormatFailed { error: &error });
                if let Some(callback) = callback {
                    callback();
                }
                self.core.notify(TransportEvent::Logged);
            }
        }
    }

    fn dispatch(&self, entry: QueueEntry) {
        let mut shared = self.core.shared.lock();
        match shared.state {
            ConnectionState::Silent => {
                drop(shared);
                self.core.metrics.record_discarded(1);
                self.core.deliver(entry);
            }
            ConnectionState::Connected => {
                // Posted under the lock so a disconnect can reclaim it in order.
                if let Err(SendError(Command::Send(entry))) =
                    self.core.commands.send(Command::Send(entry))
                {
                    shared.queue.push(entry);
                }
            }
            ConnectionState::Disconnected
            | ConnectionState::Connecting
            | ConnectionState::Terminating => {
                let line = entry.line.clone();
                shared.queue.push(entry);
                let pending = shared.queue.len();
                drop(shared);
                self.core.metrics.record_queued();
                self.core.notify(TransportEvent::Queued {
                    line: &line,
                    pending,
                });
            }
        }
    }

    /// Stop reconnecting and release the socket.
    ///
    /// A connect attempt already in flight finishes first; lines queued by
    /// then are flushed before the socket is torn down. Writes already handed
    /// to the socket are not cancelled. Idempotent.
    pub fn close(&self) {
        {
            let mut shared = self.core.shared.lock();
            if shared.terminating || shared.state == ConnectionState::Silent {
                return;
            }
            shared.terminating = true;
            shared.state = ConnectionState::Terminating;
        }
        let _ = self.core.commands.send(Command::Close);
    }

    /// `close()`, then wait up to `timeout` for the manager thread to exit.
    ///
    /// Returns `true` if it exited in time.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.close();
        let finished = match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };
        if finished {
            if let Some(worker) = self.worker.lock().take() {
                let _ = worker.join();
            }
        }
        finished
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.core.shared.lock().state
    }

    /// Connect attempts since the last successful connection; `-1` before
    /// the first attempt.
    pub fn retry_count(&self) -> i64 {
        self.core.shared.lock().retry_count
    }

    /// Lines waiting for a connection.
    pub fn queue_len(&self) -> usize {
        self.core.shared.lock().queue.len()
    }

    /// Delivery counters for this transport.
    pub fn metrics(&self) -> &TransportMetrics {
        &self.core.metrics
    }

    /// `host:port` of the collector.
    pub fn endpoint(&self) -> &str {
        &self.core.endpoint
    }
}

impl Appender for SocketAppender {
    fn append(&self, event: LogEvent) {
        self.log(event.level, &event.message, event.metadata, None);
    }

    fn close(&self) {
        SocketAppender::close(self);
    }

    fn name(&self) -> &str {
        "socket"
    }
}

impl Drop for SocketAppender {
    fn drop(&mut self) {
        self.close();
    }
}
