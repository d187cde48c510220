//! Log event structure

use super::log_level::LogLevel;
use serde_json::{Map, Value};
use std::error::Error as StdError;

/// Metadata attached to an event, resolved once at the call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    /// Arbitrary structured fields, forwarded as JSON.
    Structured(Map<String, Value>),
    /// An error-derived event. The first stack line repeats the message and
    /// is dropped when the stack is appended to the log message.
    Failure { message: String, stack: Vec<String> },
}

impl Metadata {
    pub fn empty() -> Self {
        Metadata::Structured(Map::new())
    }

    /// Structured metadata from a JSON value; non-objects are wrapped under
    /// a `value` key.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Metadata::Structured(map),
            Value::Null => Metadata::empty(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Metadata::Structured(map)
            }
        }
    }

    pub fn failure<I, S>(message: impl Into<String>, stack: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Metadata::Failure {
            message: message.into(),
            stack: stack.into_iter().map(Into::into).collect(),
        }
    }

    /// Build failure metadata from an error and its `source()` chain.
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let mut stack = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        Metadata::Failure {
            message: err.to_string(),
            stack,
        }
    }

    pub fn with_field(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        match self {
            Metadata::Structured(mut map) => {
                map.insert(key.into(), value.into());
                Metadata::Structured(map)
            }
            failure => failure,
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata::empty()
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Metadata::Structured(map)
    }
}

impl From<Value> for Metadata {
    fn from(value: Value) -> Self {
        Metadata::from_value(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub metadata: Metadata,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            metadata: Metadata::empty(),
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<Metadata>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata = self.metadata.with_field(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "request failed")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "disk full")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    impl StdError for Inner {}

    #[test]
    fn test_from_error_walks_sources() {
        let meta = Metadata::from_error(&Outer(Inner));
        assert_eq!(
            meta,
            Metadata::failure(
                "request failed",
                ["request failed", "caused by: disk full"]
            )
        );
    }

    #[test]
    fn test_from_value_wraps_scalars() {
        assert_eq!(Metadata::from_value(Value::Null), Metadata::empty());
        assert_eq!(
            Metadata::from_value(json!(42)),
            Metadata::empty().with_field("value", 42)
        );
    }

    #[test]
    fn test_with_field_keeps_insertion_order() {
        let event = LogEvent::new(LogLevel::Info, "hi")
            .with_field("b", 1)
            .with_field("a", 2);
        let Metadata::Structured(map) = event.metadata else {
            panic!("expected structured metadata");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
