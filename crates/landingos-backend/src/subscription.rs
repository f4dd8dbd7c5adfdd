use std::fmt;

use tokio::sync::mpsc;

use landingos_types::events::{ChangeEvent, SubscriptionTopic};

type Unsubscribe = Box<dyn FnOnce() + Send + 'static>;

/// Inbound queue of change notifications for one topic.
///
/// The handle owns the registration: dropping it runs the adapter's
/// unsubscribe hook, so a listener lives exactly as long as its owner.
pub struct Subscription {
    topic: SubscriptionTopic,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new<F>(
        topic: SubscriptionTopic,
        rx: mpsc::UnboundedReceiver<ChangeEvent>,
        unsubscribe: F,
    ) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            topic,
            rx,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn topic(&self) -> &SubscriptionTopic {
        &self.topic
    }

    /// Waits for the next notification. `None` once the adapter hung up.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Next already-delivered notification, without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
