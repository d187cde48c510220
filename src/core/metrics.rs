//! Transport metrics for observability
//!
//! Counters describing what happened to shipped events and to the
//! connection, readable at any time without taking the transport lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for transport observability
///
/// # Example
///
/// ```
/// use log_shipper::TransportMetrics;
///
/// let metrics = TransportMetrics::new();
/// metrics.record_queued();
/// metrics.record_sent();
///
/// assert_eq!(metrics.queued_count(), 1);
/// assert_eq!(metrics.sent_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Lines buffered while disconnected
    queued: AtomicU64,

    /// Lines written to a connection
    sent: AtomicU64,

    /// Lines dropped in silent mode or cleared from the queue
    discarded: AtomicU64,

    /// Writes that failed on an established connection
    write_failures: AtomicU64,

    /// Connect attempts, including the first
    connect_attempts: AtomicU64,

    /// Socket timeouts (connect or write)
    timeouts: AtomicU64,
}

impl TransportMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            queued: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn queued_count(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded_count(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failure_count(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn timeout_count(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queued(&self) -> u64 {
        self.queued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sent(&self) -> u64 {
        self.sent.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `count` discarded lines
    #[inline]
    pub fn record_discarded(&self, count: u64) -> u64 {
        self.discarded.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_connect_attempt(&self) -> u64 {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_timeout(&self) -> u64 {
        self.timeouts.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of handled lines that were discarded, as a percentage
    ///
    /// Returns 0.0 if nothing has been handled yet.
    pub fn discard_rate(&self) -> f64 {
        let discarded = self.discarded_count();
        let total = discarded + self.sent_count();
        if total == 0 {
            return 0.0;
        }
        (discarded as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_counters_start_at_zero() {
        let metrics = TransportMetrics::new();
        assert_eq!(metrics.queued_count(), 0);
        assert_eq!(metrics.sent_count(), 0);
        assert_eq!(metrics.discarded_count(), 0);
        assert_eq!(metrics.discard_rate(), 0.0);
    }

    #[test]
    fn test_discard_rate() {
        let metrics = TransportMetrics::new();
        for _ in 0..3 {
            metrics.record_sent();
        }
        metrics.record_discarded(1);
        assert!((metrics.discard_rate() - 25.0).abs() < 0.01);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(TransportMetrics::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_queued();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.queued_count(), 4000);
    }
}
