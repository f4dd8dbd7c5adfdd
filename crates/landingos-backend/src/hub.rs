use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use landingos_types::events::{ChangeEvent, SubscriptionTopic};

use crate::subscription::Subscription;

/// Fans change notifications out to topic-filtered subscribers.
#[derive(Clone, Default)]
pub struct RealtimeHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    /// registration id -> (topic, sender)
    subscribers: Mutex<HashMap<Uuid, (SubscriptionTopic, mpsc::UnboundedSender<ChangeEvent>)>>,
}

impl HubInner {
    // Locked from Subscription::drop, so this stays a std mutex.
    fn subscribers(
        &self,
    ) -> MutexGuard<'_, HashMap<Uuid, (SubscriptionTopic, mpsc::UnboundedSender<ChangeEvent>)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unregister(&self, registration: Uuid) {
        if self.subscribers().remove(&registration).is_some() {
            debug!("Realtime subscription {} closed", registration);
        }
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. The returned handle deregisters itself on drop.
    pub fn subscribe(&self, topic: SubscriptionTopic) -> Subscription {
        let registration = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers()
            .insert(registration, (topic.clone(), tx));

        debug!(
            "Realtime subscription {} opened on {} where {} = {}",
            registration, topic.table, topic.column, topic.value
        );

        let hub: Weak<HubInner> = Arc::downgrade(&self.inner);
        Subscription::new(topic, rx, move || {
            if let Some(inner) = hub.upgrade() {
                inner.unregister(registration);
            }
        })
    }

    /// Delivers `event` to every matching subscriber. Returns how many got it.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let mut subscribers = self.inner.subscribers();
        let mut delivered = 0;

        // Receivers that went away without dropping their handle cleanly
        // (e.g. a leaked receiver) are pruned here.
        subscribers.retain(|registration, (topic, tx)| {
            if !topic.matches(event) {
                return !tx.is_closed();
            }
            match tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    trace!("Pruning closed subscription {}", registration);
                    false
                }
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers().len()
    }
}
