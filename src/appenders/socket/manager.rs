//! Connection manager driving the socket lifecycle.
//!
//! One manager thread per transport owns the socket. It connects, flushes the
//! pending queue, writes lines handed over by the facade, notices the peer
//! closing, and decides between a delayed reconnect, silent mode, and exit.
//! `{state, retry_count, queue, terminating}` live in [`Shared`] behind the
//! transport mutex; the facade and the manager both mutate it, always under
//! the lock.

use std::io::{self, Read};
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::core::{ShipperError, TransportConfig, TransportMetrics};

use super::{
    connection::{Connection, Connector},
    observer::{TransportEvent, TransportObserver},
    queue::{PendingQueue, QueueEntry},
    state::ConnectionState,
};

pub(crate) struct Shared {
    pub(crate) state: ConnectionState,
    pub(crate) retry_count: i64,
    pub(crate) queue: PendingQueue,
    pub(crate) terminating: bool,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            retry_count: -1,
            queue: PendingQueue::new(),
            terminating: false,
        }
    }

    /// Update the state unless `close()` or silent mode already owns it.
    fn set_state(&mut self, state: ConnectionState) {
        if !self.terminating && self.state != ConnectionState::Silent {
            self.state = state;
        }
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    /// Write a line on the current connection.
    Send(QueueEntry),
    /// The watcher for connection `generation` saw the socket close.
    PeerClosed(u64),
    Close,
}

/// State shared by the facade and the manager thread.
pub(crate) struct Core {
    pub(crate) shared: Mutex<Shared>,
    pub(crate) commands: Sender<Command>,
    pub(crate) metrics: TransportMetrics,
    pub(crate) observer: Arc<dyn TransportObserver>,
    pub(crate) endpoint: String,
}

impl Core {
    pub(crate) fn new(
        commands: Sender<Command>,
        observer: Arc<dyn TransportObserver>,
        endpoint: String,
    ) -> Self {
        Self {
            shared: Mutex::new(Shared::new()),
            commands,
            metrics: TransportMetrics::new(),
            observer,
            endpoint,
        }
    }

    pub(crate) fn notify(&self, event: TransportEvent<'_>) {
        self.observer.on_event(&event);
    }

    /// Run the entry's callback and report it.
    pub(crate) fn deliver(&self, entry: QueueEntry) {
        entry.deliver();
        self.notify(TransportEvent::Logged);
    }
}

/// How a served connection ended.
enum Served {
    /// The socket closed or broke; consult the retry policy.
    Closed,
    /// `close()` was honored; the manager exits.
    Terminated,
}

enum AfterClose {
    Reconnect,
    Stop,
}

pub(crate) struct ConnectionManager<C: Connector> {
    core: Arc<Core>,
    commands: Receiver<Command>,
    connector: C,
    max_connect_retries: i64,
    retry_delay: Duration,
    write_timeout: Duration,
    generation: u64,
    done: Sender<()>,
}

impl<C: Connector> ConnectionManager<C> {
    pub(crate) fn new(
        core: Arc<Core>,
        commands: Receiver<Command>,
        connector: C,
        config: &TransportConfig,
        done: Sender<()>,
    ) -> Self {
        Self {
            core,
            commands,
            connector,
            max_connect_retries: config.max_connect_retries,
            retry_delay: config.retry_delay,
            write_timeout: config.connect_timeout,
            generation: 0,
            done,
        }
    }

    pub(crate) fn spawn(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("log-shipper-manager".to_string())
            .spawn(move || self.run())
    }

    fn run(mut self) {
        loop {
            if let Some(connection) = self.connect() {
                if let Served::Terminated = self.serve(connection) {
                    break;
                }
            }
            match self.after_close() {
                AfterClose::Reconnect => {
                    if !self.wait_before_retry() {
                        break;
                    }
                }
                AfterClose::Stop => break,
            }
        }
        let _ = self.done.send(());
    }

    fn connect(&mut self) -> Option<Connection> {
        let attempt = {
            let mut shared = self.core.shared.lock();
            if shared.terminating {
                return None;
            }
            shared.retry_count += 1;
            shared.set_state(ConnectionState::Connecting);
            shared.retry_count
        };
        self.core.metrics.record_connect_attempt();
        self.core.notify(TransportEvent::Connecting {
            endpoint: &self.core.endpoint,
            attempt,
        });

        match self.connector.connect() {
            Ok(connection) => Some(connection),
            Err(error) => {
                self.socket_error(error);
                None
            }
        }
    }

    fn socket_error(&self, error: ShipperError) {
        {
            let mut shared = self.core.shared.lock();
            if error.is_timeout() {
                // Timeouts are recoverable: the attempt is not held against
                // the retry budget and the state is left as it was.
                shared.retry_count -= 1;
            } else {
                shared.set_state(ConnectionState::Disconnected);
            }
        }
        if error.is_timeout() {
            self.core.metrics.record_timeout();
        }
        self.core.notify(TransportEvent::SocketError { error: &error });
    }

    fn serve(&mut self, mut connection: Connection) -> Served {
        self.generation += 1;
        let generation = self.generation;
        let _ = connection.set_write_timeout(Some(self.write_timeout));

        let (pending, terminating) = {
            let mut shared = self.core.shared.lock();
            shared.retry_count = 0;
            shared.set_state(ConnectionState::Connected);
            (shared.queue.drain(), shared.terminating)
        };
        if !terminating {
            self.core.notify(TransportEvent::Connected {
                endpoint: &self.core.endpoint,
            });
        }

        if !pending.is_empty() {
            self.core.notify(TransportEvent::Flushing {
                count: pending.len(),
            });
        }
        let mut pending = pending.into_iter();
        while let Some(entry) = pending.next() {
            if self.write(&mut connection, entry).is_err() {
                self.connection_lost(connection, pending.collect());
                return Served::Closed;
            }
        }

        if terminating {
            // close() arrived while connecting: the queue has been flushed,
            // now tear down without ever entering Connected.
            drop(connection);
            self.core.notify(TransportEvent::Terminated);
            return Served::Terminated;
        }

        match connection.watch_handle() {
            Ok(stream) => {
                if let Err(err) = spawn_watcher(stream, self.core.commands.clone(), generation) {
                    log::debug!("cannot watch {} for peer close: {}", self.core.endpoint, err);
                }
            }
            Err(err) => log::debug!("cannot watch {} for peer close: {}", self.core.endpoint, err),
        }

        loop {
            match self.commands.recv() {
                Ok(Command::Send(entry)) => {
                    if self.write(&mut connection, entry).is_err() {
                        self.connection_lost(connection, Vec::new());
                        return Served::Closed;
                    }
                }
                Ok(Command::PeerClosed(closed)) if closed == generation => {
                    self.connection_lost(connection, Vec::new());
                    return Served::Closed;
                }
                Ok(Command::PeerClosed(_)) => {}
                Ok(Command::Close) | Err(_) => {
                    drop(connection);
                    self.core.notify(TransportEvent::Terminated);
                    return Served::Terminated;
                }
            }
        }
    }

    /// Write one entry. Its callback runs whether or not the write worked.
    fn write(&self, connection: &mut Connection, entry: QueueEntry) -> Result<(), ShipperError> {
        let result = connection.write_line(&entry.line);
        self.core.deliver(entry);
        match result {
            Ok(()) => {
                self.core.metrics.record_sent();
                Ok(())
            }
            Err(err) => {
                let error = ShipperError::write(self.core.endpoint.clone(), err);
                self.core.metrics.record_write_failure();
                if error.is_timeout() {
                    self.core.metrics.record_timeout();
                }
                self.core.notify(TransportEvent::WriteFailed { error: &error });
                Err(error)
            }
        }
    }

    /// Destroy the connection and move every line not yet written back to the
    /// head of the pending queue.
    fn connection_lost(&self, connection: Connection, mut unsent: Vec<QueueEntry>) {
        drop(connection);
        {
            let mut shared = self.core.shared.lock();
            shared.set_state(ConnectionState::Disconnected);
            // Sends are only posted under the lock while Connected, so every
            // one still in flight is already in the channel.
            for command in self.commands.try_iter() {
                if let Command::Send(entry) = command {
                    unsent.push(entry);
                }
            }
            shared.queue.restore_front(unsent);
        }
        self.core.notify(TransportEvent::Disconnected {
            endpoint: &self.core.endpoint,
        });
    }

    /// The socket is gone: retry, give up, or stop because of `close()`.
    fn after_close(&self) -> AfterClose {
        let dropped = {
            let mut shared = self.core.shared.lock();
            if shared.terminating {
                return AfterClose::Stop;
            }
            if self.max_connect_retries < 0 || shared.retry_count < self.max_connect_retries {
                return AfterClose::Reconnect;
            }
            shared.state = ConnectionState::Silent;
            shared.queue.clear()
        };
        self.core.metrics.record_discarded(dropped as u64);
        self.core.notify(TransportEvent::Silenced { dropped });
        AfterClose::Stop
    }

    /// Sleep for the retry delay, waking early on `close()`. Returns whether
    /// to connect again.
    fn wait_before_retry(&self) -> bool {
        self.core.notify(TransportEvent::Reconnecting {
            delay: self.retry_delay,
        });
        let deadline = Instant::now() + self.retry_delay;
        loop {
            match self.commands.recv_deadline(deadline) {
                Err(RecvTimeoutError::Timeout) => return !self.core.shared.lock().terminating,
                Err(RecvTimeoutError::Disconnected) | Ok(Command::Close) => return false,
                Ok(Command::Send(entry)) => self.core.shared.lock().queue.push(entry),
                Ok(Command::PeerClosed(_)) => {}
            }
        }
    }
}

/// Block on reads until the peer closes, then report it.
fn spawn_watcher(
    mut stream: TcpStream,
    commands: Sender<Command>,
    generation: u64,
) -> io::Result<()> {
    stream.set_read_timeout(None)?;
    thread::Builder::new()
        .name("log-shipper-watch".to_string())
        .spawn(move || {
            let mut buf = [0u8; 512];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = commands.send(Command::PeerClosed(generation));
        })?;
    Ok(())
}
