//! Feed connection plumbing shared by the platform implementations.
//!
//! The session manager never talks to a socket or a timer API directly. It
//! drives a [`Transport`] and a set of [`Timers`]; both report back by posting
//! [`SyncEvent`]s onto the driver queue. The platform-specific implementations
//! are included at the bottom of this module.

use std::time::Duration;

use futures_channel::mpsc::UnboundedSender;
use serde::{Deserialize, Serialize};

use super::error::{SyncError, TransportError};

/// Lifecycle state of the feed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted; only an explicit connect revives it
    Abandoned,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Connecting or open: a connect request for the same key is a no-op.
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Open)
    }
}

/// Configuration for auto-reconnect behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Maximum number of reconnect attempts (0 = infinite)
    pub max_attempts: u32,
    /// Initial delay in milliseconds
    pub initial_delay_ms: u32,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u32,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 15000,
            backoff_multiplier: 1.5,
        }
    }
}

impl ReconnectConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u32 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = f64::from(self.initial_delay_ms) * self.backoff_multiplier.powi(exponent);
        if delay.is_finite() && delay < f64::from(self.max_delay_ms) {
            delay as u32
        } else {
            self.max_delay_ms
        }
    }
}

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Everything the driver loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Subscribe to a key; an empty key clears the subscription
    Connect(String),
    Disconnect,
    /// Stop the driver loop, releasing every resource
    Shutdown,
    Opened {
        generation: u64,
    },
    Frame {
        generation: u64,
        text: String,
    },
    Errored {
        generation: u64,
        detail: String,
    },
    Closed {
        generation: u64,
        code: Option<u16>,
        reason: String,
    },
    TimerFired(TimerId),
    VisibilityChanged {
        visible: bool,
    },
    NetworkOnline,
    NetworkOffline,
}

/// One socket at a time.
///
/// Events for a handle are tagged with the generation passed to
/// [`Transport::open`]; the manager ignores every generation but the current
/// one, so late events from a closed handle are harmless.
pub trait Transport {
    /// Open a new handle, closing any previous one first.
    fn open(&mut self, url: &str, generation: u64) -> Result<(), TransportError>;
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;
    fn is_writable(&self) -> bool;
    /// Detach listeners and close the current handle, if any.
    fn close(&mut self);
}

/// Timer service posting [`SyncEvent::TimerFired`] when a timer elapses.
pub trait Timers {
    fn start_timeout(&mut self, delay: Duration) -> TimerId;
    fn start_interval(&mut self, period: Duration) -> TimerId;
    /// Cancel a timer. Cancelling an elapsed or unknown timer is a no-op.
    fn cancel(&mut self, id: TimerId);
}

/// Cloneable handle for posting control events to a running driver.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    sender: UnboundedSender<SyncEvent>,
}

impl SyncHandle {
    pub(crate) fn new(sender: UnboundedSender<SyncEvent>) -> Self {
        Self { sender }
    }

    fn post(&self, event: SyncEvent) -> Result<(), SyncError> {
        self.sender
            .unbounded_send(event)
            .map_err(|_| SyncError::DriverStopped)
    }

    /// Subscribe to a sheet; an empty key tears the session down.
    pub fn connect(&self, key: &str) -> Result<(), SyncError> {
        self.post(SyncEvent::Connect(key.to_string()))
    }

    pub fn disconnect(&self) -> Result<(), SyncError> {
        self.post(SyncEvent::Disconnect)
    }

    pub fn shutdown(&self) -> Result<(), SyncError> {
        self.post(SyncEvent::Shutdown)
    }

    pub fn page_visibility_changed(&self, visible: bool) -> Result<(), SyncError> {
        self.post(SyncEvent::VisibilityChanged { visible })
    }

    pub fn network_online(&self) -> Result<(), SyncError> {
        self.post(SyncEvent::NetworkOnline)
    }

    pub fn network_offline(&self) -> Result<(), SyncError> {
        self.post(SyncEvent::NetworkOffline)
    }
}

// Include platform-specific implementation
#[cfg(target_arch = "wasm32")]
mod connection_wasm;
#[cfg(target_arch = "wasm32")]
pub use connection_wasm::{page_origin, sleep, EnvironmentSignals, EventTimers, SocketTransport};

#[cfg(not(target_arch = "wasm32"))]
mod connection_native;
#[cfg(not(target_arch = "wasm32"))]
pub use connection_native::{page_origin, sleep, EnvironmentSignals, EventTimers, SocketTransport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_capped() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay_for_attempt(0), 1000);
        assert_eq!(config.delay_for_attempt(2), 2250);
        assert_eq!(config.delay_for_attempt(7), 15000);
        assert_eq!(config.delay_for_attempt(u32::MAX), 15000);
    }

    #[test]
    fn handle_reports_stopped_driver() {
        let (sender, receiver) = futures_channel::mpsc::unbounded();
        let handle = SyncHandle::new(sender);
        assert!(handle.connect("sheet").is_ok());
        drop(receiver);
        assert_eq!(handle.disconnect(), Err(SyncError::DriverStopped));
    }
}
