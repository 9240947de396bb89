//! Notification store
//!
//! Keeps the most recent notifications (newest first, at most
//! [`MAX_NOTIFICATIONS`]) and an unread counter. The two are independent:
//! clearing the log keeps the counter and marking everything read keeps the log.
//! Nothing here is persisted; a new session starts empty with a zero counter.

pub mod payload;

use crate::socket::{SocketManager, Subscription};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub use payload::{Kind, Payload};

/// Maximum number of notifications kept in the log
pub const MAX_NOTIFICATIONS: usize = 20;

/// Channel event carrying notifications
pub const NOTIFICATION_EVENT: &str = "notification";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub received_at: DateTime<Utc>,
    pub payload: Payload,
}

impl Notification {
    pub fn new(payload: Payload) -> Self {
        Self {
            received_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    log: VecDeque<Notification>,
    unread: u64,
}

/// Shared handle to the notification log and unread counter
#[derive(Debug, Clone)]
pub struct NotificationStore {
    state: Arc<RwLock<State>>,
    unread_tx: Arc<watch::Sender<u64>>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (unread_tx, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(State::default())),
            unread_tx: Arc::new(unread_tx),
        }
    }

    pub fn unread_count(&self) -> u64 {
        self.state.read().unwrap_or_else(|e| e.into_inner()).unread
    }

    pub fn set_unread_count(&self, count: u64) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.unread = count;
        // Published under the lock so watchers see writes in counter order
        self.unread_tx.send_replace(count);
    }

    /// Snapshot of the log, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.log.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prepend to the log, dropping the oldest entries beyond the limit.
    /// The unread counter is left alone.
    pub fn add_notification(&self, notification: Notification) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.log.push_front(notification);
        state.log.truncate(MAX_NOTIFICATIONS);
    }

    pub fn clear_notifications(&self) {
        self.state.write().unwrap_or_else(|e| e.into_inner()).log.clear();
    }

    pub fn mark_all_read(&self) {
        self.set_unread_count(0);
    }

    /// Handle one inbound notification event: log it, then count it as unread
    pub fn receive(&self, payload: Value) {
        self.add_notification(Notification::new(Payload::decode(payload)));

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.unread = state.unread.saturating_add(1);
        self.unread_tx.send_replace(state.unread);
    }

    /// Watch the unread counter
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.unread_tx.subscribe()
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds a [`NotificationStore`] from the socket for as long as it is mounted
#[derive(Debug)]
pub struct NotificationProvider {
    store: NotificationStore,
    subscription: Option<Subscription>,
}

impl NotificationProvider {
    /// Create a fresh store and register one `notification` handler on the
    /// socket's channel, if the socket has one
    pub fn mount(socket: &SocketManager) -> Self {
        let store = NotificationStore::new();

        let subscription = socket.channel().map(|channel| {
            let store = store.clone();
            channel.on(NOTIFICATION_EVENT, move |payload| store.receive(payload.clone()))
        });

        if subscription.is_none() {
            log::debug!("[notifications] No channel, store will only change locally");
        }

        Self { store, subscription }
    }

    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    pub fn is_listening(&self) -> bool {
        self.subscription.is_some()
    }

    /// Deregister the channel handler
    pub fn unmount(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::socket::{testing::Loopback, Frame};
    use crate::storage::{write_token, MemoryStorage};
    use serde_json::json;

    fn raw(n: u64) -> Payload {
        Payload::decode(json!({ "id": n }))
    }

    fn connected(loopback: &Loopback) -> SocketManager {
        let storage = MemoryStorage::new();
        write_token(&storage, "tok").unwrap();
        let mut socket = SocketManager::new(&Config::default(), Arc::new(loopback.clone()));
        socket.mount(&storage);
        loopback.emit(Frame::Opened);
        socket
    }

    #[test]
    fn test_counts_and_bounds_for_any_n() {
        for n in [0u64, 1, 19, 20, 21, 57] {
            let store = NotificationStore::new();
            for i in 1..=n {
                store.receive(json!({ "id": i }));
            }

            assert_eq!(store.unread_count(), n);
            assert_eq!(store.len(), (n as usize).min(MAX_NOTIFICATIONS));
            if n > 0 {
                assert_eq!(store.notifications()[0].payload, raw(n));
            }
        }
    }

    #[test]
    fn test_twenty_five_arrivals() {
        let store = NotificationStore::new();
        for i in 1..=25 {
            store.receive(json!({ "id": i }));
        }

        assert_eq!(store.unread_count(), 25);
        let ids: Vec<Payload> = store.notifications().into_iter().map(|n| n.payload).collect();
        let expected: Vec<Payload> = (6..=25).rev().map(raw).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_add_notification_leaves_counter() {
        let store = NotificationStore::new();
        store.add_notification(Notification::new(raw(1)));
        store.add_notification(Notification::new(raw(2)));

        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.notifications()[0].payload, raw(2));
    }

    #[test]
    fn test_clear_keeps_counter() {
        let store = NotificationStore::new();
        for i in 0..5 {
            store.receive(json!({ "id": i }));
        }
        store.clear_notifications();

        assert!(store.is_empty());
        assert_eq!(store.unread_count(), 5);
    }

    #[test]
    fn test_mark_all_read_keeps_log() {
        let store = NotificationStore::new();
        for i in 0..3 {
            store.receive(json!({ "id": i }));
        }
        let before = store.notifications();
        store.mark_all_read();

        assert_eq!(store.unread_count(), 0);
        assert_eq!(store.notifications(), before);
    }

    #[test]
    fn test_set_unread_count() {
        let store = NotificationStore::new();
        store.set_unread_count(9);
        store.receive(json!({}));
        assert_eq!(store.unread_count(), 10);
    }

    #[test]
    fn test_subscribe_sees_counter() {
        let store = NotificationStore::new();
        let mut unread = store.subscribe();

        store.receive(json!({"id": 1}));
        assert!(unread.has_changed().unwrap());
        assert_eq!(*unread.borrow_and_update(), 1);

        store.mark_all_read();
        assert_eq!(*unread.borrow_and_update(), 0);
    }

    #[test]
    fn test_watch_matches_counter_under_contention() {
        let store = NotificationStore::new();
        let unread = store.subscribe();

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        if worker % 2 == 0 && i % 50 == 0 {
                            store.mark_all_read();
                        } else {
                            store.receive(json!({ "id": i }));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(*unread.borrow(), store.unread_count());
    }

    #[test]
    fn test_received_payload_is_stored_verbatim() {
        let wire = json!({
            "type": "message",
            "conversation_id": "c1",
            "sender_id": "s1",
            "id": 42,
            "created_at": "2024-01-01T00:00:00Z"
        });
        let store = NotificationStore::new();
        store.receive(wire.clone());

        let stored = &store.notifications()[0].payload;
        assert!(matches!(stored.kind(), Some(Kind::Message { .. })));
        assert_eq!(serde_json::to_value(stored).unwrap(), wire);
    }

    #[test]
    fn test_provider_receives_channel_events() {
        let loopback = Loopback::new();
        let socket = connected(&loopback);
        let provider = NotificationProvider::mount(&socket);
        assert!(provider.is_listening());

        loopback.notify(json!({"type": "like", "user_id": "u3"}));
        loopback.notify(json!({"id": 2}));
        loopback.emit(Frame::Event {
            name: "typing".into(),
            payload: json!({"id": 3}),
        });

        let store = provider.store();
        assert_eq!(store.unread_count(), 2);
        assert_eq!(store.notifications()[0].payload, raw(2));
        assert!(matches!(store.notifications()[1].payload.kind(), Some(Kind::Like { .. })));
    }

    #[test]
    fn test_provider_unmount_deregisters() {
        let loopback = Loopback::new();
        let socket = connected(&loopback);
        let provider = NotificationProvider::mount(&socket);
        let store = provider.store().clone();
        let channel = socket.channel().unwrap();
        assert_eq!(channel.handler_count(NOTIFICATION_EVENT), 1);

        provider.unmount();
        assert_eq!(channel.handler_count(NOTIFICATION_EVENT), 0);

        loopback.notify(json!({"id": 1}));
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_remount_does_not_duplicate_handler() {
        let loopback = Loopback::new();
        let socket = connected(&loopback);

        let first = NotificationProvider::mount(&socket);
        drop(first);
        let second = NotificationProvider::mount(&socket);

        loopback.notify(json!({"id": 1}));
        assert_eq!(socket.channel().unwrap().handler_count(NOTIFICATION_EVENT), 1);
        assert_eq!(second.store().unread_count(), 1);
    }

    #[test]
    fn test_provider_without_channel() {
        let loopback = Loopback::new();
        let mut socket = SocketManager::new(&Config::default(), Arc::new(loopback.clone()));
        socket.mount(&MemoryStorage::new());

        let provider = NotificationProvider::mount(&socket);
        assert!(!provider.is_listening());

        provider.store().add_notification(Notification::new(raw(1)));
        assert_eq!(provider.store().len(), 1);
    }
}
