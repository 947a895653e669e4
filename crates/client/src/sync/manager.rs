//! Session state machine for the order feed.
//!
//! [`SyncManager`] owns the transport handle, the heartbeat, reconnect and
//! environment-retry timers, the reconnect policy and the notification gate.
//! It is driven one [`SyncEvent`] at a time by the driver loop and never
//! blocks; all side effects go through the [`Transport`], [`Timers`] and
//! collaborator traits handed to it at construction.

use std::ops::ControlFlow;
use std::rc::Rc;
use std::time::Duration;

use orderdesk_shared::OutboundFrame;

use crate::config::SyncConfig;

use super::address::{feed_url, PageOrigin};
use super::collaborators::{Clock, Notice, NotificationSink, QueryInvalidator, Severity};
use super::connection::{SessionState, SyncEvent, TimerId, Timers, Transport};
use super::reconnect::ReconnectPolicy;
use super::router::MessageRouter;
use super::throttle::NotificationGate;

const RECONNECTED_NOTICE_DURATION: Duration = Duration::from_secs(3);

/// Everything outside the feed the manager reports to.
#[derive(Clone)]
pub struct Collaborators {
    pub cache: Rc<dyn QueryInvalidator>,
    pub notifier: Rc<dyn NotificationSink>,
    pub clock: Rc<dyn Clock>,
    /// Called with the new connectivity flag whenever it changes
    pub on_status: Rc<dyn Fn(bool)>,
}

pub struct SyncManager {
    config: SyncConfig,
    origin: PageOrigin,
    transport: Box<dyn Transport>,
    timers: Box<dyn Timers>,
    notifier: Rc<dyn NotificationSink>,
    clock: Rc<dyn Clock>,
    on_status: Rc<dyn Fn(bool)>,
    router: MessageRouter,
    policy: ReconnectPolicy,

    key: Option<String>,
    state: SessionState,
    /// Generation of the live transport handle, if any
    generation: Option<u64>,
    next_generation: u64,
    connected: bool,
    last_activity_ms: Option<i64>,
    /// Set by an unexpected close, cleared by the next open
    had_failure: bool,
    /// Set by disconnect(); suppresses environment retries
    manually_closed: bool,
    abandon_notified: bool,

    heartbeat: Option<TimerId>,
    reconnect_timer: Option<TimerId>,
    environment_timer: Option<TimerId>,
}

impl SyncManager {
    pub fn new(
        config: SyncConfig,
        origin: PageOrigin,
        transport: Box<dyn Transport>,
        timers: Box<dyn Timers>,
        collaborators: Collaborators,
    ) -> Self {
        let Collaborators {
            cache,
            notifier,
            clock,
            on_status,
        } = collaborators;

        let router = MessageRouter::new(
            cache,
            notifier.clone(),
            NotificationGate::new(config.notify_cooldown_ms, config.throttle_scope),
            config.local_actor_id.clone(),
        );
        let policy = ReconnectPolicy::new(config.reconnect.clone());

        Self {
            config,
            origin,
            transport,
            timers,
            notifier,
            clock,
            on_status,
            router,
            policy,
            key: None,
            state: SessionState::Idle,
            generation: None,
            next_generation: 0,
            connected: false,
            last_activity_ms: None,
            had_failure: false,
            manually_closed: false,
            abandon_notified: false,
            heartbeat: None,
            reconnect_timer: None,
            environment_timer: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscription_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Wall-clock time of the last inbound frame on the current session.
    pub fn last_activity_ms(&self) -> Option<i64> {
        self.last_activity_ms
    }

    /// Reconnect attempts made since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.policy.attempt()
    }

    /// Apply one event. Breaks once the driver should stop.
    pub fn handle(&mut self, event: SyncEvent) -> ControlFlow<()> {
        match event {
            SyncEvent::Connect(key) => self.connect(&key),
            SyncEvent::Disconnect => self.disconnect(),
            SyncEvent::Shutdown => {
                self.end_session();
                return ControlFlow::Break(());
            }
            SyncEvent::Opened { generation } => {
                if self.is_current(generation) {
                    self.on_open();
                }
            }
            SyncEvent::Frame { generation, text } => {
                if self.is_current(generation) {
                    self.on_frame(&text);
                }
            }
            SyncEvent::Errored { generation, detail } => {
                if self.is_current(generation) {
                    self.on_error(&detail);
                }
            }
            SyncEvent::Closed {
                generation,
                code,
                reason,
            } => {
                if self.is_current(generation) {
                    self.on_close(code, &reason);
                }
            }
            SyncEvent::TimerFired(id) => self.on_timer(id),
            SyncEvent::VisibilityChanged { visible } => {
                if visible {
                    self.environment_retry("page visible");
                }
            }
            SyncEvent::NetworkOnline => self.on_online(),
            SyncEvent::NetworkOffline => self.on_offline(),
        }
        ControlFlow::Continue(())
    }

    fn is_current(&self, generation: u64) -> bool {
        if self.generation == Some(generation) {
            true
        } else {
            crate::log_debug!("sync: dropping event from stale socket #{}", generation);
            false
        }
    }

    /// Subscribe to `key`, replacing any session for a different key.
    pub fn connect(&mut self, key: &str) {
        if key.trim().is_empty() {
            self.end_session();
            return;
        }

        match self.key.as_deref() {
            Some(current) if current == key => {
                if self.state.is_live() {
                    return;
                }
                self.cancel_timer_slot(TimerSlot::Reconnect);
                self.policy.reset();
            }
            _ => {
                self.end_session();
                self.key = Some(key.to_string());
                self.policy.reset();
                self.router.reset_gate();
                self.had_failure = false;
                self.last_activity_ms = None;
            }
        }

        self.manually_closed = false;
        self.abandon_notified = false;
        self.cancel_timer_slot(TimerSlot::Environment);
        self.open_transport();
    }

    /// Close the session's socket and stop every timer, keeping the key so
    /// a later `connect` can resume it.
    pub fn disconnect(&mut self) {
        self.manually_closed = true;
        self.release();
        if self.key.is_some() {
            self.state = SessionState::Closed;
        }
        self.set_connected(false);
    }

    /// Drop the session entirely.
    fn end_session(&mut self) {
        if self.key.is_none() && self.generation.is_none() {
            return;
        }
        self.release();
        self.key = None;
        self.state = SessionState::Idle;
        self.manually_closed = false;
        self.set_connected(false);
    }

    /// Cancel every timer and close the live handle, if any.
    fn release(&mut self) {
        self.cancel_timer_slot(TimerSlot::Reconnect);
        self.cancel_timer_slot(TimerSlot::Environment);
        self.stop_heartbeat();
        if self.generation.take().is_some() {
            self.state = SessionState::Closing;
            self.transport.close();
            self.state = SessionState::Closed;
        }
    }

    fn open_transport(&mut self) {
        let Some(key) = self.key.clone() else {
            return;
        };

        let url = match feed_url(&self.origin, self.config.server_port, &key) {
            Ok(url) => url,
            Err(e) => {
                crate::log_error!("sync: cannot address feed for '{}': {}", key, e);
                self.handle_transport_lost(None, &e.to_string());
                return;
            }
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        self.generation = Some(generation);
        self.state = SessionState::Connecting;
        crate::log_info!("sync: connecting to {} (socket #{})", url, generation);

        if let Err(e) = self.transport.open(&url, generation) {
            crate::log_error!("sync: failed to open socket: {}", e);
            self.handle_transport_lost(None, &e.to_string());
        }
    }

    fn on_open(&mut self) {
        crate::log_info!(
            "sync: connected to '{}'",
            self.key.as_deref().unwrap_or_default()
        );
        self.state = SessionState::Open;
        self.policy.reset();
        self.abandon_notified = false;
        self.set_connected(true);
        self.start_heartbeat();
        self.send_ping();

        if std::mem::take(&mut self.had_failure) {
            self.notifier.notify(Notice::new(
                "Reconnected to live order updates",
                Severity::Success,
                Some(RECONNECTED_NOTICE_DURATION),
            ));
        }
    }

    fn on_frame(&mut self, text: &str) {
        let now = self.clock.now_ms();
        self.last_activity_ms = Some(now);

        if self.state.is_open() && !self.connected {
            self.set_connected(true);
        }

        if let Err(e) = self.router.route_frame(text, now) {
            crate::log_warn!("sync: dropping malformed frame: {}", e);
        }
    }

    fn on_error(&mut self, detail: &str) {
        crate::log_error!("sync: socket error: {}", detail);
        self.set_connected(false);
    }

    fn on_close(&mut self, code: Option<u16>, reason: &str) {
        self.handle_transport_lost(code, reason);
    }

    /// Unexpected loss of the socket: close out the handle and arm a retry.
    fn handle_transport_lost(&mut self, code: Option<u16>, reason: &str) {
        crate::log_warn!(
            "sync: connection closed (code {:?}): {}",
            code,
            if reason.is_empty() { "no reason" } else { reason }
        );
        self.stop_heartbeat();
        if self.generation.take().is_some() {
            self.transport.close();
        }
        self.state = SessionState::Closed;
        self.had_failure = true;
        self.set_connected(false);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.manually_closed || self.key.is_none() {
            return;
        }
        self.cancel_timer_slot(TimerSlot::Reconnect);

        match self.policy.next_delay() {
            Some(delay) => {
                let attempt = self.policy.attempt();
                crate::log_info!(
                    "sync: reconnect attempt {} in {}ms",
                    attempt,
                    delay.as_millis()
                );
                self.state = SessionState::Reconnecting { attempt };
                self.reconnect_timer = Some(self.timers.start_timeout(delay));
            }
            None => {
                crate::log_error!(
                    "sync: giving up after {} reconnect attempts",
                    self.policy.attempt()
                );
                self.state = SessionState::Abandoned;
                if !self.abandon_notified {
                    self.abandon_notified = true;
                    self.notifier.notify(Notice::new(
                        "Lost connection to live order updates. Please refresh the page.",
                        Severity::Error,
                        None,
                    ));
                }
            }
        }
    }

    fn on_timer(&mut self, id: TimerId) {
        if self.heartbeat == Some(id) {
            self.send_ping();
        } else if self.reconnect_timer == Some(id) {
            self.cancel_timer_slot(TimerSlot::Reconnect);
            if matches!(self.state, SessionState::Reconnecting { .. }) {
                self.open_transport();
            }
        } else if self.environment_timer == Some(id) {
            self.cancel_timer_slot(TimerSlot::Environment);
            if let Some(key) = self.key.clone() {
                if !self.state.is_open() && !self.manually_closed {
                    self.connect(&key);
                }
            }
        } else {
            crate::log_debug!("sync: ignoring stale timer {:?}", id);
        }
    }

    /// Visibility regained or network back: retry shortly if not open.
    fn environment_retry(&mut self, cause: &str) {
        if self.key.is_none() || self.state.is_open() || self.manually_closed {
            return;
        }
        if self.environment_timer.is_some() {
            return;
        }
        crate::log_info!("sync: {}, reconnecting shortly", cause);
        self.environment_timer = Some(
            self.timers
                .start_timeout(self.config.environment_retry_delay()),
        );
    }

    fn on_online(&mut self) {
        if self.state.is_open() {
            let writable = self.transport.is_writable();
            self.set_connected(writable);
        } else {
            self.environment_retry("network online");
        }
    }

    /// Connectivity lost: flag it without forcing the socket closed.
    fn on_offline(&mut self) {
        crate::log_warn!("sync: network offline");
        self.set_connected(false);
    }

    fn start_heartbeat(&mut self) {
        self.stop_heartbeat();
        self.heartbeat = Some(self.timers.start_interval(self.config.heartbeat_interval()));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(id) = self.heartbeat.take() {
            self.timers.cancel(id);
        }
    }

    fn send_ping(&mut self) {
        if !self.transport.is_writable() {
            return;
        }
        if let Err(e) = self.transport.send_text(&OutboundFrame::Ping.to_json()) {
            crate::log_debug!("sync: heartbeat not sent: {}", e);
        }
    }

    fn cancel_timer_slot(&mut self, slot: TimerSlot) {
        let timer = match slot {
            TimerSlot::Reconnect => self.reconnect_timer.take(),
            TimerSlot::Environment => self.environment_timer.take(),
        };
        if let Some(id) = timer {
            self.timers.cancel(id);
        }
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            (self.on_status)(connected);
        }
    }
}

#[derive(Clone, Copy)]
enum TimerSlot {
    Reconnect,
    Environment,
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        // The UI may already be gone, so the status callback is skipped here.
        self.release();
    }
}
