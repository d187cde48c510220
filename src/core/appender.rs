//! Appender trait for log shipping destinations

use super::log_event::LogEvent;

/// Callback run once a line has been handed to the transport.
///
/// It reports hand-off, not acknowledgement by the collector, and it never
/// carries an error.
pub type DeliveryCallback = Box<dyn FnOnce() + Send + 'static>;

pub trait Appender: Send + Sync {
    /// Ship one event. Never blocks on the network and never fails.
    fn append(&self, event: LogEvent);
    /// Stop shipping and release the connection. Idempotent.
    fn close(&self);
    fn name(&self) -> &str;
}
