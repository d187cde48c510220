//! Diagnostic channel for transport internals.
//!
//! Transport errors are never returned to the code that logs an event. They
//! are reported here instead, so an operator can still see why lines are
//! queued or dropped.

use std::time::Duration;

use crate::core::ShipperError;

/// Something worth reporting happened inside a transport.
#[derive(Debug)]
pub enum TransportEvent<'a> {
    Connecting { endpoint: &'a str, attempt: i64 },
    Connected { endpoint: &'a str },
    Flushing { count: usize },
    Queued { line: &'a str, pending: usize },
    SocketError { error: &'a ShipperError },
    WriteFailed { error: &'a ShipperError },
    FormatFailed { error: &'a ShipperError },
    Disconnected { endpoint: &'a str },
    Reconnecting { delay: Duration },
    /// Retries exhausted; `dropped` queued lines were discarded.
    Silenced { dropped: usize },
    Terminated,
    /// A delivery callback has run.
    Logged,
}

/// Receives [`TransportEvent`]s.
///
/// Called from the logging thread and the manager thread, never while the
/// transport lock is held. Implementations must return quickly; they may
/// query the transport or log through it.
pub trait TransportObserver: Send + Sync {
    fn on_event(&self, event: &TransportEvent<'_>);
}

/// Default observer forwarding to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TransportObserver for LogObserver {
    fn on_event(&self, event: &TransportEvent<'_>) {
        match event {
            TransportEvent::Connecting { endpoint, attempt } => {
                log::debug!("connecting to {} (attempt {})", endpoint, attempt)
            }
            TransportEvent::Connected { endpoint } => log::info!("connected to {}", endpoint),
            TransportEvent::Flushing { count } => log::debug!("flushing {} messages", count),
            TransportEvent::Queued { line, pending } => {
                log::trace!("not connected, queuing ({} pending): {}", pending, line)
            }
            TransportEvent::SocketError { error } if error.is_timeout() => {
                log::info!("socket timeout: {}", error)
            }
            TransportEvent::SocketError { error } => log::warn!("socket error: {}", error),
            TransportEvent::WriteFailed { error } => log::warn!("send error: {}", error),
            TransportEvent::FormatFailed { error } => {
                log::warn!("dropping event that could not be formatted: {}", error)
            }
            TransportEvent::Disconnected { endpoint } => {
                log::debug!("socket to {} closed", endpoint)
            }
            TransportEvent::Reconnecting { delay } => {
                log::debug!("reconnecting in {:?}", delay)
            }
            TransportEvent::Silenced { dropped } => log::error!(
                "max retries reached, transport in silent mode ({} queued messages dropped)",
                dropped
            ),
            TransportEvent::Terminated => log::debug!("transport closed"),
            TransportEvent::Logged => {}
        }
    }
}
