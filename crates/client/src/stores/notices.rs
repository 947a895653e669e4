//! Toast notices raised by the order feed.

use dioxus::prelude::*;

use crate::sync::{sleep, Notice, NotificationSink};

/// A notice on screen, with the id used to dismiss it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownNotice {
    pub id: u64,
    pub notice: Notice,
}

/// Notices currently shown, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoticeList {
    next_id: u64,
    shown: Vec<ShownNotice>,
}

impl NoticeList {
    /// Add a notice, returning its id.
    pub fn push(&mut self, notice: Notice) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.shown.push(ShownNotice { id, notice });
        id
    }

    /// Remove a notice. Returns false if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.shown.len();
        self.shown.retain(|n| n.id != id);
        self.shown.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShownNotice> {
        self.shown.iter()
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}

pub static NOTICES: GlobalSignal<NoticeList> = Signal::global(NoticeList::default);

pub fn push_notice(notice: Notice) -> u64 {
    NOTICES.write().push(notice)
}

pub fn dismiss_notice(id: u64) {
    NOTICES.write().dismiss(id);
}

/// [`NotificationSink`] showing notices in [`NOTICES`], dismissing timed
/// ones once their duration has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreNotifier;

impl NotificationSink for StoreNotifier {
    fn notify(&self, notice: Notice) {
        crate::log_info!("notice: {}", notice.message);
        let duration = notice.duration;
        let id = push_notice(notice);
        if let Some(duration) = duration {
            spawn(async move {
                sleep(duration).await;
                dismiss_notice(id);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::sync::Severity;

    fn notice(message: &str) -> Notice {
        Notice::new(message, Severity::Info, Some(Duration::from_secs(2)))
    }

    #[test]
    fn dismiss_removes_only_the_given_notice() {
        let mut list = NoticeList::default();
        let first = list.push(notice("first"));
        let second = list.push(notice("second"));
        assert_ne!(first, second);

        assert!(list.dismiss(first));
        assert!(!list.dismiss(first));
        let remaining: Vec<_> = list.iter().map(|n| n.notice.message.as_str()).collect();
        assert_eq!(remaining, ["second"]);
    }

    #[test]
    fn ids_are_not_reused_after_dismissal() {
        let mut list = NoticeList::default();
        let first = list.push(notice("a"));
        list.dismiss(first);
        let second = list.push(notice("b"));
        assert!(second > first);
        assert_eq!(list.len(), 1);
    }
}
