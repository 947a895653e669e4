//! In-memory collaborators for driving the sync core in tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use orderdesk_shared::QueryKey;

use super::collaborators::{Clock, Notice, NotificationSink, QueryInvalidator};
use super::connection::{TimerId, Timers, Transport};
use super::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCall {
    Invalidate(QueryKey),
    Refetch(QueryKey),
}

/// Records cache calls, notices and connectivity changes.
#[derive(Default)]
pub struct Recorder {
    pub cache_calls: RefCell<Vec<CacheCall>>,
    pub notices: RefCell<Vec<Notice>>,
    pub statuses: RefCell<Vec<bool>>,
}

impl Recorder {
    pub fn cache_calls(&self) -> Vec<CacheCall> {
        self.cache_calls.borrow().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    pub fn notice_messages(&self) -> Vec<String> {
        self.notices.borrow().iter().map(|n| n.message.clone()).collect()
    }

    pub fn clear(&self) {
        self.cache_calls.borrow_mut().clear();
        self.notices.borrow_mut().clear();
        self.statuses.borrow_mut().clear();
    }
}

impl QueryInvalidator for Recorder {
    fn invalidate(&self, key: QueryKey) {
        self.cache_calls.borrow_mut().push(CacheCall::Invalidate(key));
    }

    fn force_refetch(&self, key: QueryKey) {
        self.cache_calls.borrow_mut().push(CacheCall::Refetch(key));
    }
}

impl NotificationSink for Recorder {
    fn notify(&self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }
}

/// Manually advanced clock.
#[derive(Default)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, by_ms: i64) {
        self.now.set(self.now.get() + by_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

#[derive(Default, Debug)]
pub struct SocketLog {
    pub opened: Vec<(String, u64)>,
    pub sent: Vec<String>,
    pub closes: usize,
    pub attached: bool,
    pub writable: bool,
    pub fail_next_open: bool,
}

/// Transport that only records what it was asked to do.
#[derive(Clone, Default)]
pub struct FakeTransport {
    pub log: Rc<RefCell<SocketLog>>,
}

impl Transport for FakeTransport {
    fn open(&mut self, url: &str, generation: u64) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if log.attached {
            log.closes += 1;
        }
        log.attached = false;
        log.writable = false;
        if std::mem::take(&mut log.fail_next_open) {
            return Err(TransportError::Construct("refused".to_string()));
        }
        log.opened.push((url.to_string(), generation));
        log.attached = true;
        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        let mut log = self.log.borrow_mut();
        if !log.writable {
            return Err(TransportError::NotOpen);
        }
        log.sent.push(text.to_string());
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.log.borrow().writable
    }

    fn close(&mut self) {
        let mut log = self.log.borrow_mut();
        if log.attached {
            log.closes += 1;
        }
        log.attached = false;
        log.writable = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub delay: Duration,
    pub repeating: bool,
}

#[derive(Default, Debug)]
pub struct TimerLog {
    pub next_id: u64,
    pub pending: BTreeMap<TimerId, PendingTimer>,
    pub cancelled: Vec<TimerId>,
}

impl TimerLog {
    pub fn pending_intervals(&self) -> usize {
        self.pending.values().filter(|t| t.repeating).count()
    }

    pub fn pending_timeouts(&self) -> Vec<Duration> {
        self.pending
            .values()
            .filter(|t| !t.repeating)
            .map(|t| t.delay)
            .collect()
    }
}

/// Timers that never fire on their own; tests post `TimerFired` explicitly.
#[derive(Clone, Default)]
pub struct FakeTimers {
    pub log: Rc<RefCell<TimerLog>>,
}

impl FakeTimers {
    fn start(&mut self, delay: Duration, repeating: bool) -> TimerId {
        let mut log = self.log.borrow_mut();
        log.next_id += 1;
        let id = TimerId(log.next_id);
        log.pending.insert(id, PendingTimer { delay, repeating });
        id
    }
}

impl Timers for FakeTimers {
    fn start_timeout(&mut self, delay: Duration) -> TimerId {
        self.start(delay, false)
    }

    fn start_interval(&mut self, period: Duration) -> TimerId {
        self.start(period, true)
    }

    fn cancel(&mut self, id: TimerId) {
        let mut log = self.log.borrow_mut();
        if log.pending.remove(&id).is_some() {
            log.cancelled.push(id);
        }
    }
}
