//! Inbound frame classification and dispatch.
//!
//! Every frame becomes cache work against the query store and, for a few
//! kinds, a throttled notice. The router owns no connection state, so a bad
//! frame can only ever cost that frame.

use std::rc::Rc;
use std::time::Duration;

use orderdesk_shared::{CellEdit, DataUpdate, FrameError, InboundMessage, QueryKey, UpdateKind};

use super::collaborators::{Notice, NotificationSink, QueryInvalidator, Severity};
use super::throttle::{NotificationClass, NotificationGate};

const REFRESH_NOTICE_DURATION: Duration = Duration::from_secs(2);
const CHANGE_NOTICE_DURATION: Duration = Duration::from_secs(3);

pub struct MessageRouter {
    cache: Rc<dyn QueryInvalidator>,
    notifier: Rc<dyn NotificationSink>,
    gate: NotificationGate,
    local_actor: String,
}

impl MessageRouter {
    pub fn new(
        cache: Rc<dyn QueryInvalidator>,
        notifier: Rc<dyn NotificationSink>,
        gate: NotificationGate,
        local_actor: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            notifier,
            gate,
            local_actor: local_actor.into(),
        }
    }

    /// Parse and dispatch one text frame.
    pub fn route_frame(&mut self, text: &str, now_ms: i64) -> Result<(), FrameError> {
        let message = InboundMessage::parse(text)?;
        self.route(&message, now_ms);
        Ok(())
    }

    pub fn route(&mut self, message: &InboundMessage, now_ms: i64) {
        match message {
            InboundMessage::ConnectionStatus { status, message } => {
                crate::log_info!(
                    "sync: server reports {} {}",
                    status.as_deref().unwrap_or("status"),
                    message.as_deref().unwrap_or_default()
                );
            }
            InboundMessage::HeartbeatAck => crate::log_debug!("sync: heartbeat acknowledged"),
            InboundMessage::ServerPing | InboundMessage::Echo => {
                crate::log_debug!("sync: ignoring server {}", message.label());
            }
            InboundMessage::DataUpdate(update) => self.route_update(update, now_ms),
            InboundMessage::CellEdit(edit) => self.route_cell_edit(edit, now_ms),
            InboundMessage::Unknown { kind } => {
                crate::log_warn!("sync: ignoring frame of unknown type '{}'", kind);
            }
        }
    }

    /// Clear the notification cooldown, for a new session.
    pub fn reset_gate(&mut self) {
        self.gate.reset();
    }

    fn route_update(&mut self, update: &DataUpdate, now_ms: i64) {
        match &update.kind {
            UpdateKind::Overview => {
                self.cache.invalidate(QueryKey::OrdersOverview);
                if let Some(pending) = update.pending_orders().filter(|n| *n > 0) {
                    self.notify_gated(
                        NotificationClass::OverviewRefresh,
                        now_ms,
                        Notice::new(
                            format!("Dashboard refreshed: {} pending orders", pending),
                            Severity::Info,
                            Some(REFRESH_NOTICE_DURATION),
                        ),
                    );
                }
            }
            UpdateKind::NewOrder => {
                self.invalidate_order_views();
                self.notify_gated(
                    NotificationClass::NewOrder,
                    now_ms,
                    Notice::new(
                        "New order added",
                        Severity::Success,
                        Some(CHANGE_NOTICE_DURATION),
                    ),
                );
            }
            // Row rewrites come from this desk's own edit form.
            UpdateKind::RowUpdate => self.invalidate_order_views(),
            UpdateKind::ActionCompleted { action } => {
                crate::log_info!(
                    "sync: bulk {} finished for {} orders",
                    action,
                    update.affected_count().unwrap_or(0)
                );
                self.invalidate_order_views();
            }
            UpdateKind::Other(kind) => {
                crate::log_warn!("sync: ignoring data update of unknown kind '{}'", kind);
            }
        }
    }

    fn route_cell_edit(&mut self, edit: &CellEdit, now_ms: i64) {
        self.invalidate_order_views();
        // An in-flight overview fetch may predate the edit.
        self.cache.force_refetch(QueryKey::OrdersOverview);

        if edit.actor == self.local_actor {
            crate::log_debug!("sync: own edit of '{}' echoed back", edit.column);
            return;
        }

        self.notify_gated(
            NotificationClass::ExternalEdit,
            now_ms,
            Notice::new(
                describe_edit(edit),
                Severity::Info,
                Some(CHANGE_NOTICE_DURATION),
            ),
        );
    }

    fn invalidate_order_views(&self) {
        for key in QueryKey::ORDER_VIEWS {
            self.cache.invalidate(key);
        }
    }

    fn notify_gated(&mut self, class: NotificationClass, now_ms: i64, notice: Notice) {
        if self.gate.should_notify(class, now_ms) {
            self.notifier.notify(notice);
        } else {
            crate::log_debug!("sync: {:?} notice held back by cooldown", class);
        }
    }
}

fn describe_edit(edit: &CellEdit) -> String {
    match &edit.new_value {
        Some(value) => format!("{} set {} to \"{}\"", edit.actor, edit.column, value),
        None => format!("{} updated {}", edit.actor, edit.column),
    }
}
