//! Toast notification queue with TTL-based auto-expiry.
//!
//! Notifications render in arrival order and disappear on their own once
//! their time-to-live runs out, or earlier when dismissed. Duplicates are
//! deliberately NOT coalesced: three failed toggles mean three toasts.
//! Expiry is driven by `prune`, called from the app's tick handler with
//! an explicit instant so behavior is testable without sleeping.

use std::time::{Duration, Instant};

/// Notification severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

/// Queue-assigned notification identity, for early dismissal.
pub type NotificationId = u64;

#[derive(Debug)]
struct Queued {
    id: NotificationId,
    notification: Notification,
    expires_at: Instant,
}

/// FIFO queue of visible notifications.
#[derive(Debug)]
pub struct NotificationQueue {
    entries: Vec<Queued>,
    ttl: Duration,
    next_id: NotificationId,
}

#[allow(dead_code)]
impl NotificationQueue {
    /// Default time a toast stays visible.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Vec::new(),
            ttl,
            next_id: 0,
        }
    }

    /// Enqueue a notification at `now`. It stays visible for the queue's
    /// default TTL unless dismissed first. Returns the entry's id.
    pub fn push(&mut self, notification: Notification, now: Instant) -> NotificationId {
        self.push_with_ttl(notification, now, self.ttl)
    }

    /// Enqueue a notification with its own TTL, overriding the queue
    /// default for this entry only.
    pub fn push_with_ttl(
        &mut self,
        notification: Notification,
        now: Instant,
        ttl: Duration,
    ) -> NotificationId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Queued {
            id,
            notification,
            expires_at: now + ttl,
        });
        id
    }

    /// Drop every notification whose TTL has elapsed at `now`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|q| q.expires_at > now);
        before - self.entries.len()
    }

    /// Dismiss one notification by id. Dismissal is terminal: the id is
    /// never reused, so a dismissed entry cannot come back.
    pub fn dismiss(&mut self, id: NotificationId) -> Option<Notification> {
        let index = self.entries.iter().position(|q| q.id == id)?;
        Some(self.entries.remove(index).notification)
    }

    /// Dismiss the oldest visible notification, if any.
    pub fn dismiss_oldest(&mut self) -> Option<Notification> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).notification)
        }
    }

    /// Visible notifications in arrival order.
    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter().map(|q| &q.notification)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
