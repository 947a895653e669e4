//! Live order feed client.
//!
//! A [`SyncDriver`] keeps one WebSocket subscription to the order feed open
//! for the current sheet, reconnecting with backoff when it drops, and turns
//! every inbound frame into query invalidations and throttled notices.
//! Everything runs on one task; the UI talks to it through a [`SyncHandle`].

pub mod address;
pub mod collaborators;
pub mod connection;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod manager;
pub mod reconnect;
pub mod router;
pub mod throttle;

#[cfg(test)]
mod testing;

pub use address::{feed_url, PageOrigin};
pub use collaborators::{Clock, Notice, NotificationSink, QueryInvalidator, Severity, SystemClock};
pub use connection::{
    sleep, ReconnectConfig, SessionState, SyncEvent, SyncHandle, TimerId, Timers, Transport,
};
pub use driver::SyncDriver;
pub use error::{AddressError, SyncError, TransportError};
pub use hooks::{use_order_sync, OrderSync};
pub use manager::{Collaborators, SyncManager};
pub use throttle::{NotificationClass, NotificationGate, ThrottleScope};
