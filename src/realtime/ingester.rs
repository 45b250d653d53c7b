use super::feed::{ChangeEvent, ChangeFeed, ChangeType, FeedMessage, FeedSubscription};
use crate::cache::{SharedCache, UpsertOutcome};
use crate::error::{SyncError, SyncResult};
use crate::events::CacheChange;
use crate::logging::log_error;
use crate::models::TaskId;
use crate::reconciliation::WriteSource;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// What one feed message did to the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Insert or update routed through reconciliation
    Upserted { task_id: TaskId, outcome: UpsertOutcome },
    /// Delete applied; `was_visible` is false when readers could not see the
    /// task anyway (unknown or already optimistically deleted)
    Removed { task_id: TaskId, was_visible: bool },
    /// Record could not be decoded and was dropped
    Malformed,
    /// Connection status change
    StaleChanged { stale: bool },
}

/// Translates feed events into cache writes.
///
/// Inserts and updates become `upsert(candidate, Realtime)` and are therefore
/// deferred while a local mutation on the same id is in flight. Deletes are
/// applied immediately and unconditionally.
pub struct RealtimeIngester {
    cache: SharedCache,
    subscription: Mutex<Option<FeedSubscription>>,
    /// Reason of the last disconnect, cleared on reconnect
    outage: Mutex<Option<String>>,
}

impl RealtimeIngester {
    pub fn new(cache: SharedCache) -> Arc<Self> {
        Arc::new(Self {
            cache,
            subscription: Mutex::new(None),
            outage: Mutex::new(None),
        })
    }

    /// Subscribe to `entity` on `feed`. A second call while subscribed is
    /// ignored; the ingester subscribes once.
    pub fn start(self: &Arc<Self>, feed: &dyn ChangeFeed, entity: &str) -> bool {
        let mut slot = self.subscription.lock();
        if slot.is_some() {
            warn!(entity = entity, "Realtime ingester already subscribed");
            return false;
        }

        let ingester: Weak<Self> = Arc::downgrade(self);
        let subscription = feed.subscribe(
            entity,
            Arc::new(move |message| {
                if let Some(ingester) = ingester.upgrade() {
                    ingester.handle(message);
                }
            }),
        );
        *slot = Some(subscription);
        info!(entity = entity, "Realtime ingester subscribed");
        true
    }

    pub fn stop(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
            info!("Realtime ingester unsubscribed");
        }
        self.outage.lock().take();
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Fails while the feed is down, since a re-fetch taken now would miss
    /// whatever the feed drops before it reconnects
    pub fn ensure_connected(&self) -> SyncResult<()> {
        match self.outage.lock().clone() {
            Some(reason) => Err(SyncError::RealtimeDisconnect { reason }),
            None => Ok(()),
        }
    }

    pub fn handle(&self, message: FeedMessage) -> IngestOutcome {
        match message {
            FeedMessage::Change(event) => self.apply_change(&event),
            FeedMessage::Disconnected { reason } => {
                warn!(reason = %reason, "Realtime feed disconnected, marking cache stale");
                *self.outage.lock() = Some(reason);
                self.set_stale(true)
            }
            FeedMessage::Reconnected => {
                self.outage.lock().take();
                // Events may have been missed while disconnected; only a
                // re-fetch clears the stale flag
                info!("Realtime feed reconnected, cache remains stale until resync");
                IngestOutcome::StaleChanged {
                    stale: self.cache.read(|cache| cache.is_stale()),
                }
            }
        }
    }

    fn apply_change(&self, event: &ChangeEvent) -> IngestOutcome {
        match event.change_type {
            ChangeType::Insert | ChangeType::Update => match event.candidate() {
                Ok(candidate) => {
                    let task_id = candidate.id.clone();
                    let outcome = self.cache.write(|cache, changes| {
                        let outcome = cache.upsert(candidate, WriteSource::Realtime);
                        changes.extend(outcome.change_for(&task_id));
                        outcome
                    });
                    debug!(
                        task_id = %task_id,
                        change_type = %event.change_type,
                        verdict = %outcome.verdict(),
                        "Applied realtime change"
                    );
                    IngestOutcome::Upserted { task_id, outcome }
                }
                Err(err) => {
                    log_error(
                        "realtime_ingester",
                        "decode_record",
                        &err.to_string(),
                        Some(&event.change_type.to_string()),
                    );
                    IngestOutcome::Malformed
                }
            },
            ChangeType::Delete => {
                let Some(task_id) = event.task_id() else {
                    warn!("Realtime delete without an id, dropping");
                    return IngestOutcome::Malformed;
                };
                let was_visible = self.cache.write(|cache, changes| {
                    let removed = cache.remove(&task_id).is_some();
                    if removed {
                        changes.push(CacheChange::Removed(task_id.clone()));
                    }
                    removed
                });
                debug!(task_id = %task_id, was_visible = was_visible, "Applied realtime delete");
                IngestOutcome::Removed {
                    task_id,
                    was_visible,
                }
            }
        }
    }

    fn set_stale(&self, stale: bool) -> IngestOutcome {
        self.cache.write(|cache, changes| {
            if cache.set_stale(stale) {
                changes.push(CacheChange::StaleChanged(stale));
            }
        });
        IngestOutcome::StaleChanged { stale }
    }
}

impl std::fmt::Debug for RealtimeIngester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeIngester")
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}
