use crate::models::{Task, TaskId};
use crate::realtime::{ChangeEvent, ChangeFeed, ChangeType, FeedHandler, FeedMessage, FeedSubscription};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    handlers: Vec<(u64, String, FeedHandler)>,
}

/// Change feed driven by the test: every `emit` is delivered synchronously to
/// the handlers subscribed to that entity
#[derive(Clone, Default)]
pub struct ManualFeed {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl ManualFeed {
    pub const ENTITY: &'static str = "tasks";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, entity: &str, message: FeedMessage) {
        let handlers: Vec<FeedHandler> = self
            .subscribers
            .lock()
            .handlers
            .iter()
            .filter(|(_, subscribed, _)| subscribed == entity)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(message.clone());
        }
    }

    pub fn insert(&self, task: &Task) {
        self.emit_change(ChangeType::Insert, task);
    }

    pub fn update(&self, task: &Task) {
        self.emit_change(ChangeType::Update, task);
    }

    pub fn delete(&self, id: &TaskId) {
        let mut event = ChangeEvent::new(ChangeType::Delete, json!({}));
        event.previous_record = Some(json!({ "id": id }));
        self.emit(Self::ENTITY, FeedMessage::Change(event));
    }

    pub fn disconnect(&self, reason: &str) {
        self.emit(
            Self::ENTITY,
            FeedMessage::Disconnected {
                reason: reason.to_string(),
            },
        );
    }

    pub fn reconnect(&self) {
        self.emit(Self::ENTITY, FeedMessage::Reconnected);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().handlers.len()
    }

    fn emit_change(&self, change_type: ChangeType, task: &Task) {
        let record = serde_json::to_value(task).unwrap_or_default();
        self.emit(
            Self::ENTITY,
            FeedMessage::Change(ChangeEvent::new(change_type, record)),
        );
    }
}

impl ChangeFeed for ManualFeed {
    fn subscribe(&self, entity: &str, handler: FeedHandler) -> FeedSubscription {
        let id = {
            let mut subscribers = self.subscribers.lock();
            subscribers.next_id += 1;
            let id = subscribers.next_id;
            subscribers.handlers.push((id, entity.to_string(), handler));
            id
        };

        let subscribers = Arc::clone(&self.subscribers);
        FeedSubscription::new(move || {
            subscribers.lock().handlers.retain(|(existing, _, _)| *existing != id);
        })
    }
}
