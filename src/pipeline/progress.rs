use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;

/// One human-readable status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl fmt::Display for ProgressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}

/// Append-only audit trail of a run.
///
/// Entries keep the order `record` was called in and their timestamps never
/// go backwards, even if the wall clock does.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    entries: Vec<ProgressEntry>,
}

impl ProgressLog {
    pub fn record(&mut self, message: impl Into<String>) -> ProgressEntry {
        self.record_at(message, Local::now())
    }

    fn record_at(&mut self, message: impl Into<String>, now: DateTime<Local>) -> ProgressEntry {
        let timestamp = match self.entries.last() {
            Some(previous) if previous.timestamp > now => previous.timestamp,
            _ => now,
        };
        let entry = ProgressEntry {
            message: message.into(),
            timestamp,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn entries(&self) -> &[ProgressEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::ProgressLog;
    use chrono::{Duration, Local};

    #[test]
    fn entries_keep_call_order() {
        let mut log = ProgressLog::default();
        log.record("Uploading video...");
        log.record("Extracting audio...");
        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["Uploading video...", "Extracting audio..."]);
    }

    #[test]
    fn timestamps_never_move_backwards() {
        let mut log = ProgressLog::default();
        let now = Local::now();
        log.record_at("first", now);
        let second = log.record_at("second", now - Duration::seconds(5));
        assert_eq!(second.timestamp, now);
        let third = log.record_at("third", now + Duration::seconds(1));
        assert!(third.timestamp > second.timestamp);
    }

    #[test]
    fn display_prefixes_wall_clock_time() {
        let mut log = ProgressLog::default();
        let entry = log.record("Fetching subtitles...");
        let rendered = entry.to_string();
        assert!(rendered.starts_with('['));
        assert!(rendered.ends_with("] Fetching subtitles..."));
        assert_eq!(log.entries().last(), Some(&entry));
    }
}
