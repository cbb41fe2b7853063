use super::level::LogLevel;
use chrono::{DateTime, SecondsFormat, Utc};

/// One leveled, already-rendered log message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    level: LogLevel,
    message: String,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Render the sink line: `<timestamp>\t<LEVEL>\t<message>`.
    ///
    /// Line breaks inside the message are escaped so every event stays on one line.
    pub fn render(&self, at: DateTime<Utc>) -> String {
        let mut line = String::with_capacity(self.message.len() + 40);
        line.push_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true));
        line.push('\t');
        line.push_str(self.level.as_str());
        line.push('\t');

        for ch in self.message.chars() {
            match ch {
                '\n' => line.push_str("\\n"),
                '\r' => line.push_str("\\r"),
                _ => line.push(ch),
            }
        }

        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap()
    }

    #[test]
    fn test_render_format() {
        let event = LogEvent::new(LogLevel::Warn, "disk almost full");
        assert_eq!(
            event.render(fixed_time()),
            "2024-05-01T12:30:45.000Z\tWARN\tdisk almost full"
        );
    }

    #[test]
    fn test_render_escapes_newlines() {
        let event = LogEvent::new(LogLevel::Error, "line one\nline two\r\n");
        let line = event.render(fixed_time());
        assert!(!line.contains('\n'));
        assert!(line.ends_with("line one\\nline two\\r\\n"));
    }

    #[test]
    fn test_message_is_kept_verbatim() {
        let event = LogEvent::new(LogLevel::Info, "  spaced\ttabbed  ");
        assert_eq!(event.message(), "  spaced\ttabbed  ");
        assert_eq!(event.level(), LogLevel::Info);
    }
}
