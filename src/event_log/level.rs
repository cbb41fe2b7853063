//! Severity levels and the threshold filter applied by the writer task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event severity, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "ERROR")]
    Error,
    #[serde(alias = "WARN", alias = "warning")]
    Warn,
    #[serde(alias = "INFO")]
    Info,
    #[serde(alias = "DEBUG")]
    Debug,
}

impl LogLevel {
    /// Severity rank: 1 is the most severe (ERROR), 4 the least (DEBUG).
    pub fn rank(self) -> u8 {
        match self {
            Self::Error => 1,
            Self::Warn => 2,
            Self::Info => 3,
            Self::Debug => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }

    /// Parse a level tag: a name (`"warn"`, `"WARNING"`) or a numeric rank (`"2"`).
    ///
    /// Returns `None` for anything that is not a recognized tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "ERROR" | "1" => Some(Self::Error),
            "WARN" | "WARNING" | "2" => Some(Self::Warn),
            "INFO" | "3" => Some(Self::Info),
            "DEBUG" | "4" => Some(Self::Debug),
            _ => None,
        }
    }

    /// Split a `"<TAG> <message>"` line into a level and message.
    ///
    /// When the first word is not a level tag the whole input is kept as an
    /// INFO message, so untagged text is never rejected.
    pub fn parse_tagged(input: &str) -> (Self, String) {
        let trimmed = input.trim_start();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (trimmed, ""),
        };

        match Self::from_tag(head) {
            Some(level) if !rest.is_empty() => (level, rest.to_string()),
            _ => (Self::Info, input.to_string()),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s).ok_or_else(|| format!("unknown log level: {}", s))
    }
}

/// Minimum severity that reaches the sink.
///
/// Captured by value when the writer task is spawned and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFilter {
    threshold: LogLevel,
}

impl LevelFilter {
    pub fn new(threshold: LogLevel) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    pub fn should_emit(&self, level: LogLevel) -> bool {
        level.rank() <= self.threshold.rank()
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}
