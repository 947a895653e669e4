//! Dioxus hook wiring the order feed into a component tree.
//!
//! The feed writes to the global query and notice stores; components read
//! those stores, not the feed.

use std::rc::Rc;

use dioxus::prelude::*;

use super::collaborators::SystemClock;
use super::connection::SyncHandle;
use super::driver::SyncDriver;
use super::manager::Collaborators;
use crate::config::SyncConfig;
use crate::stores::{StoreInvalidator, StoreNotifier};

/// What a component sees of the feed.
#[derive(Clone)]
pub struct OrderSync {
    connected: Signal<bool>,
    sheet_key: Signal<String>,
    local_actor_id: String,
    handle: Option<SyncHandle>,
}

impl OrderSync {
    /// Reactive connectivity flag.
    pub fn is_connected(&self) -> bool {
        (self.connected)()
    }

    /// Actor id to send as `user_id` with this client's edits. Cell edits
    /// carrying it never raise a notice here.
    pub fn local_actor_id(&self) -> &str {
        &self.local_actor_id
    }

    /// (Re)connect to the current sheet, resetting the retry budget.
    pub fn connect(&self) {
        if let Some(handle) = &self.handle {
            let key = self.sheet_key.peek().clone();
            if let Err(e) = handle.connect(&key) {
                crate::log_error!("sync: connect failed: {}", e);
            }
        }
    }

    pub fn disconnect(&self) {
        if let Some(handle) = &self.handle {
            if let Err(e) = handle.disconnect() {
                crate::log_error!("sync: disconnect failed: {}", e);
            }
        }
    }
}

/// Keep a feed subscription open for `sheet_key` while the component is
/// mounted. An empty key means no subscription.
///
/// ### Example
///
/// ```rust,ignore
/// let sheet_key = use_signal(|| "orders".to_string());
/// let sync = use_order_sync(sheet_key);
///
/// // Tag our own edits so they don't come back as notices.
/// let editor = sync.local_actor_id().to_string();
///
/// rsx! {
///     if !sync.is_connected() {
///         button { onclick: move |_| sync.connect(), "Reconnect" }
///     }
/// }
/// ```
pub fn use_order_sync(sheet_key: Signal<String>) -> OrderSync {
    let connected = use_signal(|| false);
    let config = use_hook(SyncConfig::load);
    let local_actor_id = config.local_actor_id.clone();

    let handle = use_hook(move || {
        let collaborators = Collaborators {
            cache: Rc::new(StoreInvalidator),
            notifier: Rc::new(StoreNotifier),
            clock: Rc::new(SystemClock),
            on_status: Rc::new(move |is_connected| {
                let mut connected = connected;
                // The signal may be gone while the driver winds down.
                if let Ok(mut flag) = connected.try_write() {
                    *flag = is_connected;
                };
            }),
        };

        match SyncDriver::new(config, collaborators) {
            Ok((driver, handle)) => {
                spawn(driver.run());
                Some(handle)
            }
            Err(e) => {
                crate::log_error!("sync: live updates unavailable: {}", e);
                None
            }
        }
    });

    let effect_handle = handle.clone();
    use_effect(move || {
        let key = sheet_key();
        if let Some(handle) = &effect_handle {
            if let Err(e) = handle.connect(&key) {
                crate::log_error!("sync: connect failed: {}", e);
            }
        }
    });

    let drop_handle = handle.clone();
    use_drop(move || {
        if let Some(handle) = &drop_handle {
            let _ = handle.shutdown();
        }
    });

    OrderSync {
        connected,
        sheet_key,
        local_actor_id,
        handle,
    }
}
