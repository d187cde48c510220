//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity attached to every shipped event.
///
/// Covers both the npm-style names applications tend to use (`verbose`,
/// `silly`) and the syslog names. Ordering follows severity, so
/// `LogLevel::Error > LogLevel::Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silly = 0,
    Debug = 1,
    Verbose = 2,
    #[default]
    Info = 3,
    Notice = 4,
    Warn = 5,
    Error = 6,
    Crit = 7,
    Alert = 8,
    Emerg = 9,
}

impl LogLevel {
    pub const ALL: [LogLevel; 10] = [
        LogLevel::Silly,
        LogLevel::Debug,
        LogLevel::Verbose,
        LogLevel::Info,
        LogLevel::Notice,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Crit,
        LogLevel::Alert,
        LogLevel::Emerg,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Silly => "silly",
            LogLevel::Debug => "debug",
            LogLevel::Verbose => "verbose",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Crit => "crit",
            LogLevel::Alert => "alert",
            LogLevel::Emerg => "emerg",
        }
    }

    /// Numeric syslog severity (RFC 5424 section 6.2.1).
    ///
    /// Levels below `debug` collapse onto `debug`.
    pub fn syslog_severity(&self) -> u8 {
        match self {
            LogLevel::Emerg => 0,
            LogLevel::Alert => 1,
            LogLevel::Crit => 2,
            LogLevel::Error => 3,
            LogLevel::Warn => 4,
            LogLevel::Notice => 5,
            LogLevel::Info => 6,
            LogLevel::Verbose | LogLevel::Debug | LogLevel::Silly => 7,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silly" | "trace" => Ok(LogLevel::Silly),
            "debug" => Ok(LogLevel::Debug),
            "verbose" => Ok(LogLevel::Verbose),
            "info" | "informational" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "err" => Ok(LogLevel::Error),
            "crit" | "critical" => Ok(LogLevel::Crit),
            "alert" => Ok(LogLevel::Alert),
            "emerg" | "emergency" | "panic" => Ok(LogLevel::Emerg),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("err".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Silly));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_syslog_severity() {
        assert_eq!(LogLevel::Emerg.syslog_severity(), 0);
        assert_eq!(LogLevel::Error.syslog_severity(), 3);
        assert_eq!(LogLevel::Info.syslog_severity(), 6);
        assert_eq!(LogLevel::Silly.syslog_severity(), 7);
    }
}
