use std::collections::VecDeque;

use chrono::{Local, NaiveTime};

/// Lines kept before the oldest is dropped.
pub const LOG_CAPACITY: usize = 200;

/// Append-only activity log holding the most recent lines, each stamped
/// `[HH:MM:SS]`.
#[derive(Debug, Clone)]
pub struct BoundedLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for BoundedLog {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl BoundedLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(LOG_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: impl AsRef<str>) {
        self.push_at(Local::now().time(), line);
    }

    pub fn push_at(&mut self, time: NaiveTime, line: impl AsRef<str>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines
            .push_back(format!("[{}] {}", time.format("%H:%M:%S"), line.as_ref()));
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}
