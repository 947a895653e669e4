//! Cooldown gate for user-visible notifications.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Notification classes subject to the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationClass {
    OverviewRefresh,
    NewOrder,
    ExternalEdit,
}

/// Whether classes share one cooldown window or get one each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleScope {
    /// One window across all classes: a new-order toast also holds back the
    /// next overview toast.
    #[default]
    Shared,
    PerClass,
}

#[derive(Debug, Clone)]
pub struct NotificationGate {
    cooldown_ms: i64,
    scope: ThrottleScope,
    last_emitted: HashMap<Option<NotificationClass>, i64>,
}

impl NotificationGate {
    pub fn new(cooldown_ms: u32, scope: ThrottleScope) -> Self {
        Self {
            cooldown_ms: i64::from(cooldown_ms),
            scope,
            last_emitted: HashMap::new(),
        }
    }

    /// Returns `true` and records `now_ms` iff more than the cooldown has
    /// passed since the last emission in the same slot. A refused call leaves
    /// the gate untouched.
    pub fn should_notify(&mut self, class: NotificationClass, now_ms: i64) -> bool {
        let slot = match self.scope {
            ThrottleScope::Shared => None,
            ThrottleScope::PerClass => Some(class),
        };
        if let Some(last) = self.last_emitted.get(&slot) {
            if now_ms - last <= self.cooldown_ms {
                return false;
            }
        }
        self.last_emitted.insert(slot, now_ms);
        true
    }

    pub fn reset(&mut self) {
        self.last_emitted.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_notification_always_passes() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::Shared);
        assert!(gate.should_notify(NotificationClass::NewOrder, 0));
    }

    #[test]
    fn events_inside_cooldown_collapse_to_one() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::Shared);
        assert!(gate.should_notify(NotificationClass::NewOrder, 1_000));
        assert!(!gate.should_notify(NotificationClass::NewOrder, 20_000));
        // exactly the cooldown is still inside the window
        assert!(!gate.should_notify(NotificationClass::NewOrder, 31_000));
        assert!(gate.should_notify(NotificationClass::NewOrder, 31_001));
    }

    #[test]
    fn refused_calls_do_not_extend_the_window() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::Shared);
        assert!(gate.should_notify(NotificationClass::OverviewRefresh, 0));
        assert!(!gate.should_notify(NotificationClass::OverviewRefresh, 29_000));
        assert!(gate.should_notify(NotificationClass::OverviewRefresh, 30_001));
    }

    #[test]
    fn shared_scope_crosses_classes() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::Shared);
        assert!(gate.should_notify(NotificationClass::NewOrder, 0));
        assert!(!gate.should_notify(NotificationClass::OverviewRefresh, 5_000));
        assert!(!gate.should_notify(NotificationClass::ExternalEdit, 5_000));
    }

    #[test]
    fn per_class_scope_tracks_classes_independently() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::PerClass);
        assert!(gate.should_notify(NotificationClass::NewOrder, 0));
        assert!(gate.should_notify(NotificationClass::OverviewRefresh, 5_000));
        assert!(!gate.should_notify(NotificationClass::NewOrder, 5_000));
    }

    #[test]
    fn reset_reopens_the_gate() {
        let mut gate = NotificationGate::new(30_000, ThrottleScope::Shared);
        assert!(gate.should_notify(NotificationClass::NewOrder, 0));
        gate.reset();
        assert!(gate.should_notify(NotificationClass::NewOrder, 1));
    }
}
