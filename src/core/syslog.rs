//! Syslog record framing for RFC 5424 and RFC 3164.

use super::config::Facility;
use super::log_level::LogLevel;
use chrono::{DateTime, Local, SecondsFormat, Utc};

const NILVALUE: &str = "-";
const MAX_HOSTNAME: usize = 255;
const MAX_APP_NAME: usize = 48;
const MAX_PROCID: usize = 128;
const MAX_TAG: usize = 32;

/// Which RFC grammar to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyslogFormat {
    Rfc5424,
    Rfc3164,
}

/// Static header fields shared by every record a transport produces.
#[derive(Debug, Clone)]
pub struct SyslogProducer {
    format: SyslogFormat,
    facility: Facility,
    hostname: String,
    app_name: String,
    procid: String,
}

impl SyslogProducer {
    pub fn new(
        format: SyslogFormat,
        facility: Facility,
        hostname: &str,
        app_name: &str,
        pid: u32,
    ) -> Self {
        let (hostname, app_name) = match format {
            SyslogFormat::Rfc5424 => (
                header_field(hostname, MAX_HOSTNAME),
                header_field(app_name, MAX_APP_NAME),
            ),
            SyslogFormat::Rfc3164 => (header_field(hostname, MAX_HOSTNAME), tag_field(app_name)),
        };
        Self {
            format,
            facility,
            hostname,
            app_name,
            procid: header_field(&pid.to_string(), MAX_PROCID),
        }
    }

    pub fn priority(&self, level: LogLevel) -> u16 {
        u16::from(self.facility.code()) * 8 + u16::from(level.syslog_severity())
    }

    /// Frame `body` as a complete record stamped with the current time.
    pub fn produce(&self, level: LogLevel, body: &str) -> String {
        self.produce_at(level, body, Utc::now())
    }

    pub fn produce_at(&self, level: LogLevel, body: &str, at: DateTime<Utc>) -> String {
        let pri = self.priority(level);
        match self.format {
            SyslogFormat::Rfc5424 => format!(
                "<{}>1 {} {} {} {} {} {} {}",
                pri,
                at.to_rfc3339_opts(SecondsFormat::Millis, true),
                self.hostname,
                self.app_name,
                self.procid,
                NILVALUE,
                NILVALUE,
                body
            ),
            SyslogFormat::Rfc3164 => format!(
                "<{}>{} {} {}[{}]: {}",
                pri,
                at.with_timezone(&Local).format("%b %e %H:%M:%S"),
                self.hostname,
                self.app_name,
                self.procid,
                body
            ),
        }
    }
}

/// PRINTUSASCII without spaces, truncated; `-` when nothing survives.
fn header_field(value: &str, max: usize) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_graphic())
        .take(max)
        .collect();
    if cleaned.is_empty() {
        NILVALUE.to_string()
    } else {
        cleaned
    }
}

/// RFC 3164 TAG: alphanumerics (plus `-`, `_`, `.`), at most 32 characters.
fn tag_field(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(MAX_TAG)
        .collect();
    if cleaned.is_empty() {
        NILVALUE.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn test_rfc5424_framing() {
        let producer =
            SyslogProducer::new(SyslogFormat::Rfc5424, Facility::Local0, "web-1", "api", 4242);
        let record = producer.produce_at(LogLevel::Error, "[error] disk full {}", fixed_time());
        assert_eq!(
            record,
            "<131>1 2024-03-05T14:07:09.000Z web-1 api 4242 - - [error] disk full {}"
        );
    }

    #[test]
    fn test_rfc3164_framing() {
        let producer =
            SyslogProducer::new(SyslogFormat::Rfc3164, Facility::User, "web-1", "api", 7);
        let record = producer.produce_at(LogLevel::Info, "[info] up {}", fixed_time());
        assert!(record.starts_with("<14>"));
        assert!(record.ends_with(" web-1 api[7]: [info] up {}"));
    }

    #[test]
    fn test_header_fields_are_sanitised() {
        let long_name = "x".repeat(100);
        let producer = SyslogProducer::new(
            SyslogFormat::Rfc5424,
            Facility::Local0,
            "my host",
            &long_name,
            1,
        );
        let record = producer.produce_at(LogLevel::Info, "body", fixed_time());
        let fields: Vec<&str> = record.split(' ').collect();
        assert_eq!(fields[2], "myhost");
        assert_eq!(fields[3].len(), 48);

        let producer = SyslogProducer::new(SyslogFormat::Rfc5424, Facility::Local0, "", "", 1);
        let record = producer.produce_at(LogLevel::Info, "body", fixed_time());
        assert!(record.contains(" - - 1 - - body"));
    }

    #[test]
    fn test_tag_limit() {
        let producer = SyslogProducer::new(
            SyslogFormat::Rfc3164,
            Facility::Local0,
            "h",
            "a-very-long-application-name-for-tags",
            1,
        );
        let record = producer.produce_at(LogLevel::Info, "body", fixed_time());
        assert!(record.contains(" h a-very-long-application-name-for[1]: body"));
    }
}
