//! Capped, shared log of operator-facing events.
//!
//! Every line is also forwarded to `tracing` so the terminal shows the same
//! stream the dashboard polls.

use crate::types::LogTone;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{error, info, warn};

/// One timestamped log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub text: String,
    pub tone: LogTone,
}

impl LogEntry {
    /// `[HH:MM:SS.mmm] text`
    pub fn render(&self) -> String {
        format!("[{}] {}", self.timestamp.format("%H:%M:%S%.3f"), self.text)
    }
}

/// Append-only log trimmed from the front in batches.
pub struct EventLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    trim_batch: usize,
}

impl EventLog {
    /// Once `capacity` is exceeded the oldest `trim_batch` entries are dropped.
    pub fn new(capacity: usize, trim_batch: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
            trim_batch: trim_batch.clamp(1, capacity),
        }
    }

    pub fn append(&self, text: impl Into<String>, tone: LogTone) {
        let entry = LogEntry {
            timestamp: Local::now(),
            text: text.into(),
            tone,
        };

        match tone {
            LogTone::Error => error!(target: "keyprobe::console", "{}", entry.text),
            LogTone::Warning => warn!(target: "keyprobe::console", "{}", entry.text),
            _ => info!(target: "keyprobe::console", "{}", entry.text),
        }

        let mut entries = self.entries.lock();
        entries.push_back(entry);
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..self.trim_batch.max(excess));
        }
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(text, LogTone::Info);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.append(text, LogTone::Success);
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.append(text, LogTone::Warning);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(text, LogTone::Error);
    }

    /// Oldest-first copy of the current entries.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(200, 50)
    }
}
