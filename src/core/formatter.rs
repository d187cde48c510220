//! Rendering of log events into wire lines
//!
//! A [`LineFormatter`] is built once per transport from its
//! [`TransportConfig`] and turns `(level, message, metadata)` into a
//! [`FormattedLine`]: either a syslog record whose body is
//! `"[level] message {json metadata}"`, or a single-line JSON envelope.
//! Lines never carry the trailing newline; the sender appends it.

use super::config::{TransportConfig, TransportKind};
use super::error::Result;
use super::log_event::{LogEvent, Metadata};
use super::log_level::LogLevel;
use super::syslog::{SyslogFormat, SyslogProducer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Wire-ready encoding of one event, without the line terminator.
pub type FormattedLine = String;

#[derive(Debug, Clone)]
enum Encoding {
    Syslog(SyslogProducer),
    Envelope,
}

#[derive(Serialize)]
struct Envelope<'a> {
    program: &'a str,
    host: &'a str,
    level: LogLevel,
    message: &'a str,
    meta: &'a Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LineFormatter {
    encoding: Encoding,
    program: String,
    host: String,
    env_tag: Option<String>,
    meta_defaults: Map<String, Value>,
    strip_colors: bool,
}

impl LineFormatter {
    pub fn new(config: &TransportConfig) -> Self {
        let encoding = match config.kind {
            TransportKind::Rfc5424 => Encoding::Syslog(SyslogProducer::new(
                SyslogFormat::Rfc5424,
                config.facility,
                &config.local_label,
                &config.program,
                config.pid,
            )),
            TransportKind::Rfc3164 => Encoding::Syslog(SyslogProducer::new(
                SyslogFormat::Rfc3164,
                config.facility,
                &config.local_label,
                &config.program,
                config.pid,
            )),
            _ => Encoding::Envelope,
        };

        // Defaults are copied into every event, so only flat values are kept.
        let mut meta_defaults = config.meta_defaults.clone();
        meta_defaults.retain(|key, value| {
            let flat = !value.is_object() && !value.is_array();
            if !flat {
                log::debug!("ignoring non-scalar metadata default '{}'", key);
            }
            flat
        });

        Self {
            encoding,
            program: config.program.clone(),
            host: config.local_label.clone(),
            env_tag: if config.include_env_tag {
                config.env_tag.clone()
            } else {
                None
            },
            meta_defaults,
            strip_colors: config.strip_colors,
        }
    }

    pub fn format_event(&self, event: LogEvent) -> Result<FormattedLine> {
        self.format(event.level, &event.message, event.metadata)
    }

    pub fn format(
        &self,
        level: LogLevel,
        message: &str,
        metadata: Metadata,
    ) -> Result<FormattedLine> {
        let (mut message, mut meta) = match metadata {
            Metadata::Failure { stack, .. } if !stack.is_empty() => {
                let mut text = String::from(message);
                for line in stack.iter().skip(1) {
                    text.push('\n');
                    text.push_str(line);
                }
                // Keep the separator even when the stack is a single line.
                if stack.len() == 1 {
                    text.push('\n');
                }
                (text, Map::new())
            }
            Metadata::Failure { message: error, .. } => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(error));
                (message.to_string(), map)
            }
            Metadata::Structured(map) => (message.to_string(), map),
        };

        for (key, value) in &self.meta_defaults {
            meta.insert(key.clone(), value.clone());
        }

        if self.strip_colors {
            if let Cow::Owned(stripped) = strip_ansi(&message) {
                message = stripped;
            }
            for value in meta.values_mut() {
                if let Value::String(text) = value {
                    if let Cow::Owned(stripped) = strip_ansi(text) {
                        *text = stripped;
                    }
                }
            }
        }

        if let Some(env) = &self.env_tag {
            meta.insert("env".to_string(), Value::String(env.clone()));
        }

        match &self.encoding {
            Encoding::Syslog(producer) => {
                let body = format!(
                    "[{}] {} {}",
                    level,
                    message,
                    serde_json::to_string(&meta)?
                );
                Ok(producer.produce(level, &body))
            }
            Encoding::Envelope => Ok(serde_json::to_string(&Envelope {
                program: &self.program,
                host: &self.host,
                level,
                message: &message,
                meta: &meta,
            })?),
        }
    }
}

/// Remove ANSI escape sequences (CSI `ESC [ ... final` and two-byte escapes).
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.contains('\u{1b}') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                // Parameter and intermediate bytes run until a final byte in 0x40..=0x7e.
                for c in chars.by_ref() {
                    if ('\u{40}'..='\u{7e}').contains(&c) {
                        break;
                    }
                }
            }
            Some(_) | None => {}
        }
    }
    Cow::Owned(out)
}
