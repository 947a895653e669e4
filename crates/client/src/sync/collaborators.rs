//! Interfaces the sync client consumes from the rest of the application.

use std::time::Duration;

use orderdesk_shared::QueryKey;

/// The application's query cache, addressed by logical key.
pub trait QueryInvalidator {
    /// Mark a query stale so its next read fetches again.
    fn invalidate(&self, key: QueryKey);
    /// Start a fetch for a query now, regardless of freshness.
    fn force_refetch(&self, key: QueryKey);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing transient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    /// `None` keeps the notice up until dismissed
    pub duration: Option<Duration>,
}

impl Notice {
    pub fn new(message: impl Into<String>, severity: Severity, duration: Option<Duration>) -> Self {
        Self {
            message: message.into(),
            severity,
            duration,
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration.map(|d| d.as_millis() as u64)
    }
}

pub trait NotificationSink {
    fn notify(&self, notice: Notice);
}

/// Wall clock in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
