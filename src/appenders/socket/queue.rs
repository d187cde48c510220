//! Pending queue of formatted lines awaiting a connection.

use std::collections::VecDeque;
use std::fmt;

use crate::core::{DeliveryCallback, FormattedLine};

pub struct QueueEntry {
    pub line: FormattedLine,
    on_delivered: Option<DeliveryCallback>,
}

impl QueueEntry {
    pub fn new(line: FormattedLine, on_delivered: Option<DeliveryCallback>) -> Self {
        Self { line, on_delivered }
    }

    /// Consume the entry, running its callback if it has one.
    pub fn deliver(self) {
        if let Some(callback) = self.on_delivered {
            callback();
        }
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("line", &self.line)
            .field("has_callback", &self.on_delivered.is_some())
            .finish()
    }
}

/// FIFO buffer; insertion order is delivery order. No size cap.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<QueueEntry>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    /// Put entries that were handed out but never written back at the head,
    /// keeping their relative order.
    pub fn restore_front(&mut self, entries: Vec<QueueEntry>) {
        for entry in entries.into_iter().rev() {
            self.entries.push_front(entry);
        }
    }

    /// Take every entry, oldest first.
    pub fn drain(&mut self) -> VecDeque<QueueEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Drop every entry without running callbacks; returns how many.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn lines(queue: &mut PendingQueue) -> Vec<String> {
        queue.drain().into_iter().map(|e| e.line).collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = PendingQueue::new();
        for i in 0..5 {
            queue.push(QueueEntry::new(format!("line {}", i), None));
        }
        assert_eq!(queue.len(), 5);
        assert_eq!(
            lines(&mut queue),
            ["line 0", "line 1", "line 2", "line 3", "line 4"]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_restore_front_keeps_order() {
        let mut queue = PendingQueue::new();
        queue.push(QueueEntry::new("c".into(), None));
        queue.restore_front(vec![
            QueueEntry::new("a".into(), None),
            QueueEntry::new("b".into(), None),
        ]);
        assert_eq!(lines(&mut queue), ["a", "b", "c"]);
    }

    #[test]
    fn test_clear_skips_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut queue = PendingQueue::new();
        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            queue.push(QueueEntry::new(
                "x".into(),
                Some(Box::new(move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                })),
            ));
        }
        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_deliver_runs_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let entry = QueueEntry::new(
            "x".into(),
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        entry.deliver();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
