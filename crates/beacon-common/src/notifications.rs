use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// What raised an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// A plain text message arrived.
    Message,
    /// An alert code was triggered by a room member.
    Alert,
    /// Someone is asking us to join a call.
    CallInvite,
}

/// An in-app notification for overlay rendering.
#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub room_id: String,
    pub title: String,
    pub body: String,
    /// Accent color (`#rrggbb`) carried by alert codes.
    pub color: Option<String>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl Notification {
    /// Creates a message notification with a 5-second TTL.
    pub fn message(
        room_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::build(
            NotificationLevel::Message,
            room_id,
            title,
            body,
            Duration::from_secs(5),
        )
    }

    /// Creates an alert notification with a 30-second TTL.
    pub fn alert(
        room_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        let mut n = Self::build(
            NotificationLevel::Alert,
            room_id,
            title,
            body,
            Duration::from_secs(30),
        );
        n.color = Some(color.into());
        n
    }

    /// Creates a call invite notification with a 30-second TTL.
    pub fn call_invite(room_id: impl Into<String>, from: impl Into<String>) -> Self {
        let from = from.into();
        Self::build(
            NotificationLevel::CallInvite,
            room_id,
            "Incoming call",
            format!("{from} wants you to join the call"),
            Duration::from_secs(30),
        )
    }

    fn build(
        level: NotificationLevel,
        room_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            level,
            room_id: room_id.into(),
            title: title.into(),
            body: body.into(),
            color: None,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// Returns `true` if this notification has exceeded its TTL.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// A bounded queue of in-app notifications that auto-evicts expired entries.
#[derive(Debug)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationQueue {
    /// Creates a new queue with the given maximum capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a notification, evicting expired entries first.
    /// If still at capacity after eviction, the oldest entry is removed.
    pub fn push(&mut self, notification: Notification) {
        self.evict_expired();
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(notification);
    }

    /// Returns all currently visible (non-expired) notifications.
    pub fn visible(&mut self) -> Vec<&Notification> {
        self.evict_expired();
        self.items.iter().collect()
    }

    /// Drops every notification raised for `room_id` (the user opened it).
    pub fn dismiss_room(&mut self, room_id: &str) {
        self.items.retain(|n| n.room_id != room_id);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn evict_expired(&mut self) {
        self.items.retain(|n| !n.is_expired());
    }
}
