use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::i18n::Translator;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NoticeId(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// One transient, user-facing message describing the outcome of an action.
/// Carries translation keys, never resolved text; the host picks the display
/// language through [`Notice::resolve`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub id: Option<NoticeId>,
    pub kind: NoticeKind,
    pub title_key: String,
    pub message_key: String,
    pub auto_close_ms: Option<u32>,
    pub closable: bool,
}

impl Notice {
    pub fn new(title_key: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: NoticeKind::Info,
            title_key: title_key.into(),
            message_key: message_key.into(),
            auto_close_ms: Some(4_000),
            closable: true,
        }
    }

    pub fn success(title_key: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(title_key, message_key).kind(NoticeKind::Success)
    }

    pub fn error(title_key: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(title_key, message_key).kind(NoticeKind::Error)
    }

    pub fn kind(mut self, value: NoticeKind) -> Self {
        self.kind = value;
        self
    }

    pub fn auto_close_ms(mut self, value: Option<u32>) -> Self {
        self.auto_close_ms = value;
        self
    }

    pub fn closable(mut self, value: bool) -> Self {
        self.closable = value;
        self
    }

    pub fn resolve(&self, translator: &Translator) -> ResolvedNotice {
        ResolvedNotice {
            kind: self.kind,
            title: translator.t(&self.title_key).to_string(),
            message: translator.t(&self.message_key).to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedNotice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

#[derive(Default)]
struct NoticeState {
    queue: VecDeque<Notice>,
    max_visible: usize,
}

/// Bounded queue of pending notices. The oldest entry is evicted when the
/// queue outgrows its cap.
#[derive(Clone)]
pub struct NoticeManager {
    next_id: Arc<AtomicU64>,
    state: Arc<RwLock<NoticeState>>,
}

impl Default for NoticeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeManager {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(0)),
            state: Arc::new(RwLock::new(NoticeState {
                queue: VecDeque::new(),
                max_visible: 5,
            })),
        }
    }

    pub fn set_max_visible(&self, value: usize) {
        self.state
            .write()
            .expect("notice state poisoned")
            .max_visible = value.max(1);
    }

    pub fn show(&self, mut notice: Notice) -> NoticeId {
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        notice.id = Some(id);

        let mut state = self.state.write().expect("notice state poisoned");
        let limit = state.max_visible;
        state.queue.push_back(notice);
        while state.queue.len() > limit {
            state.queue.pop_front();
        }
        id
    }

    pub fn update(&self, id: NoticeId, mut notice: Notice) -> bool {
        let mut state = self.state.write().expect("notice state poisoned");
        if let Some(current) = state
            .queue
            .iter_mut()
            .find(|candidate| candidate.id == Some(id))
        {
            notice.id = Some(id);
            *current = notice;
            true
        } else {
            false
        }
    }

    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut state = self.state.write().expect("notice state poisoned");
        if let Some(index) = state.queue.iter().position(|notice| notice.id == Some(id)) {
            state.queue.remove(index);
            true
        } else {
            false
        }
    }

    pub fn dismiss_all(&self) {
        self.state
            .write()
            .expect("notice state poisoned")
            .queue
            .clear();
    }

    pub fn list(&self) -> Vec<Notice> {
        self.state
            .read()
            .expect("notice state poisoned")
            .queue
            .iter()
            .cloned()
            .collect()
    }

    /// Drains every pending notice, oldest first.
    pub fn take_all(&self) -> Vec<Notice> {
        self.state
            .write()
            .expect("notice state poisoned")
            .queue
            .drain(..)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_manager_enforces_queue_limit() {
        let manager = NoticeManager::new();
        manager.set_max_visible(2);
        manager.show(Notice::new("a.title", "a.message"));
        manager.show(Notice::new("b.title", "b.message"));
        manager.show(Notice::new("c.title", "c.message"));

        let pending = manager.list();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].title_key, "b.title");
        assert_eq!(pending[1].title_key, "c.title");
    }

    #[test]
    fn take_all_drains_queue_in_order() {
        let manager = NoticeManager::new();
        manager.show(Notice::success("s.title", "s.message"));
        manager.show(Notice::error("e.title", "e.message"));

        let drained = manager.take_all();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].kind, NoticeKind::Success);
        assert_eq!(drained[1].kind, NoticeKind::Error);
        assert!(manager.list().is_empty());
    }

    #[test]
    fn dismiss_removes_only_matching_notice() {
        let manager = NoticeManager::new();
        let first = manager.show(Notice::new("a.title", "a.message"));
        manager.show(Notice::new("b.title", "b.message"));

        assert!(manager.dismiss(first));
        assert!(!manager.dismiss(first));
        let pending = manager.list();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].title_key, "b.title");
    }

    #[test]
    fn resolve_translates_keys() {
        let translator = Translator::new();
        translator.set_locale("en-US");
        let notice = Notice::error("auth.login.error", "auth.login.invalidCredentials");
        let resolved = notice.resolve(&translator);
        assert_eq!(resolved.title, "Login failed");
        assert_eq!(resolved.message, "Invalid email or password");
    }
}
