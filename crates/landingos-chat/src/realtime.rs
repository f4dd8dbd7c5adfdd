use tracing::{debug, warn};
use uuid::Uuid;

use landingos_backend::{Backend, Subscription};
use landingos_types::Record;
use landingos_types::events::{ChangeEvent, SubscriptionTopic};
use landingos_types::models::ProjectGrouping;
use landingos_types::query::tables;

/// Notification relevant to the messaging page.
#[derive(Debug, Clone, PartialEq)]
pub enum RealtimeEvent {
    MessageInserted(Record),
    ChannelInserted(Record),
}

/// Owns at most one message subscription (for the open channel) and one
/// channel subscription (for the open grouping). Replacing either drops the
/// old handle first, which unsubscribes it.
#[derive(Debug, Default)]
pub struct RealtimeListener {
    messages: Option<Subscription>,
    channels: Option<Subscription>,
}

async fn recv(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => None,
    }
}

impl RealtimeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watching_messages(&self) -> bool {
        self.messages.is_some()
    }

    pub fn is_watching_channels(&self) -> bool {
        self.channels.is_some()
    }

    /// Follows message inserts of `channel_id`. A failed subscribe leaves the
    /// page without live updates for that channel.
    pub async fn watch_channel(&mut self, backend: &dyn Backend, channel_id: Uuid) {
        self.messages = None;

        let topic =
            SubscriptionTopic::inserts(tables::CHAT_MESSAGES, "channel_id", channel_id.to_string());
        match backend.subscribe(topic).await {
            Ok(subscription) => {
                debug!("Watching messages of channel {}", channel_id);
                self.messages = Some(subscription);
            }
            Err(e) => warn!("No live messages for channel {}: {}", channel_id, e),
        }
    }

    /// Follows channel inserts of `grouping`.
    pub async fn watch_grouping(&mut self, backend: &dyn Backend, grouping: &ProjectGrouping) {
        self.channels = None;

        let topic =
            SubscriptionTopic::inserts(tables::CHAT_CHANNELS, "project_name", grouping.as_str());
        match backend.subscribe(topic).await {
            Ok(subscription) => {
                debug!("Watching channels of '{}'", grouping);
                self.channels = Some(subscription);
            }
            Err(e) => warn!("No live channel list for '{}': {}", grouping, e),
        }
    }

    pub fn stop_messages(&mut self) {
        self.messages = None;
    }

    pub fn stop_all(&mut self) {
        self.messages = None;
        self.channels = None;
    }

    /// Waits for the next notification on either subscription. `None` when
    /// nothing is being watched or both ends hung up.
    pub async fn next(&mut self) -> Option<RealtimeEvent> {
        tokio::select! {
            Some(event) = recv(&mut self.messages) => {
                Some(RealtimeEvent::MessageInserted(event.record))
            }
            Some(event) = recv(&mut self.channels) => {
                Some(RealtimeEvent::ChannelInserted(event.record))
            }
            else => None,
        }
    }

    /// Next already-delivered notification, if any. Messages drain first.
    pub fn try_next(&mut self) -> Option<RealtimeEvent> {
        if let Some(event) = self.messages.as_mut().and_then(Subscription::try_recv) {
            return Some(RealtimeEvent::MessageInserted(event.record));
        }
        self.channels
            .as_mut()
            .and_then(Subscription::try_recv)
            .map(|event| RealtimeEvent::ChannelInserted(event.record))
    }
}
