//! Event loop owning a [`SyncManager`].

use futures_channel::mpsc::{unbounded, UnboundedReceiver};
use futures_util::StreamExt;

use crate::config::SyncConfig;

use super::connection::{
    page_origin, EnvironmentSignals, EventTimers, SocketTransport, SyncEvent, SyncHandle,
};
use super::error::SyncError;
use super::manager::{Collaborators, SyncManager};

/// Pumps transport, timer and control events into the manager, one at a time.
pub struct SyncDriver {
    manager: SyncManager,
    events: UnboundedReceiver<SyncEvent>,
    _environment: EnvironmentSignals,
}

impl SyncDriver {
    /// Build the platform transport and timers and wire them to a new queue.
    pub fn new(
        config: SyncConfig,
        collaborators: Collaborators,
    ) -> Result<(Self, SyncHandle), SyncError> {
        let origin = page_origin(&config)?;
        let (sender, events) = unbounded();
        let handle = SyncHandle::new(sender.clone());

        let environment = EnvironmentSignals::attach(handle.clone())?;
        let manager = SyncManager::new(
            config,
            origin,
            Box::new(SocketTransport::new(sender.clone())),
            Box::new(EventTimers::new(sender)),
            collaborators,
        );

        Ok((
            Self {
                manager,
                events,
                _environment: environment,
            },
            handle,
        ))
    }

    /// Run until [`SyncHandle::shutdown`] is called.
    pub async fn run(mut self) {
        crate::log_debug!("sync: driver started");
        while let Some(event) = self.events.next().await {
            if self.manager.handle(event).is_break() {
                break;
            }
        }
        crate::log_debug!("sync: driver stopped");
    }
}
