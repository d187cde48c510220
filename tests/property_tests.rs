//! Property-based tests for log_shipper using proptest

use log_shipper::appenders::socket::{PendingQueue, QueueEntry};
use log_shipper::core::{strip_ansi, LineFormatter};
use log_shipper::prelude::*;
use proptest::prelude::*;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn envelope_formatter() -> LineFormatter {
    LineFormatter::new(
        &TransportConfig::new("collector", 28777)
            .with_program("prop")
            .with_local_label("host"),
    )
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// More important levels never map to a less urgent syslog severity
    #[test]
    fn test_severity_is_monotonic(a in any_level(), b in any_level()) {
        if a <= b {
            prop_assert!(a.syslog_severity() >= b.syslog_severity());
        }
    }
}

// ============================================================================
// Formatting Tests
// ============================================================================

proptest! {
    /// Envelope lines are single-line JSON carrying the message verbatim
    #[test]
    fn test_envelope_is_single_line(
        level in any_level(),
        message in ".*",
        key in "[a-z]{1,8}",
        value in ".*",
    ) {
        let formatter = envelope_formatter();
        let line = formatter
            .format(level, &message, Metadata::empty().with_field(key.clone(), value.clone()))
            .unwrap();

        prop_assert!(!line.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        prop_assert_eq!(parsed["message"].as_str(), Some(message.as_str()));
        prop_assert_eq!(parsed["meta"][key.as_str()].as_str(), Some(value.as_str()));
        prop_assert_eq!(parsed["level"].as_str(), Some(level.to_str()));
    }

    /// A stack replaces metadata and appends every frame after the first
    #[test]
    fn test_stack_frames_follow_message(
        message in "[a-z ]{0,20}",
        frames in prop::collection::vec("[a-z.()]{1,12}", 2..6),
    ) {
        let line = envelope_formatter()
            .format(LogLevel::Error, &message, Metadata::failure("boom", frames.clone()))
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();

        let expected = std::iter::once(message.clone())
            .chain(frames.iter().skip(1).cloned())
            .collect::<Vec<_>>()
            .join("\n");
        prop_assert_eq!(parsed["message"].as_str(), Some(expected.as_str()));
        prop_assert_eq!(&parsed["meta"], &serde_json::json!({}));
    }

    /// The same event always renders to the same bytes, queued or not
    #[test]
    fn test_formatting_is_deterministic(level in any_level(), message in ".*") {
        let formatter = envelope_formatter();
        let first = formatter.format(level, &message, Metadata::empty()).unwrap();
        let second = formatter
            .format_event(LogEvent::new(level, message.clone()))
            .unwrap();
        prop_assert_eq!(first, second);
    }

    /// Stripping removes every escape and is idempotent
    #[test]
    fn test_strip_ansi_idempotent(
        parts in prop::collection::vec(("[a-z ]{0,6}", 0u8..108), 0..8),
    ) {
        let input: String = parts
            .iter()
            .map(|(text, code)| format!("\u{1b}[{}m{}", code, text))
            .collect();
        let once = strip_ansi(&input).into_owned();
        prop_assert!(!once.contains('\u{1b}'), "escape left in {:?}", once);
        prop_assert_eq!(strip_ansi(&once).into_owned(), once.clone());
        let plain: String = parts.iter().map(|(text, _)| text.as_str()).collect();
        prop_assert_eq!(once, plain);
    }
}

// ============================================================================
// PendingQueue Tests
// ============================================================================

proptest! {
    /// Entries handed back after a failed flush keep their place at the head
    #[test]
    fn test_queue_restore_keeps_fifo(total in 1usize..40, written in 0usize..40) {
        let written = written.min(total);
        let mut queue = PendingQueue::new();
        for i in 0..total {
            queue.push(QueueEntry::new(format!("line {}", i), None));
        }

        let mut drained = queue.drain().into_iter();
        for _ in 0..written {
            drained.next();
        }
        queue.push(QueueEntry::new("late".to_string(), None));
        queue.restore_front(drained.collect());

        let order: Vec<String> = queue.drain().into_iter().map(|e| e.line).collect();
        let mut expected: Vec<String> = (written..total).map(|i| format!("line {}", i)).collect();
        expected.push("late".to_string());
        prop_assert_eq!(order, expected);
    }
}
