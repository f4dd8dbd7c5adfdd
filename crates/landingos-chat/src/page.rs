use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use landingos_backend::Backend;
use landingos_types::Record;
use landingos_types::models::{Channel, CurrentUser, ProjectGrouping, Sender};
use landingos_types::records::NewChannel;

use crate::config::{ChatConfig, SelfEchoPolicy};
use crate::error::ChatError;
use crate::messages::MessageList;
use crate::queries;
use crate::realtime::{RealtimeEvent, RealtimeListener};
use crate::selection::{ChannelChange, SelectionState};
use crate::view::{LoadState, ViewEffect};

fn record_uuid(record: &Record, field: &str) -> Option<Uuid> {
    record.get(field).and_then(Value::as_str)?.parse().ok()
}

/// The admin messaging view: grouping picker, channel list and message pane,
/// kept live through realtime notifications.
///
/// The backend and current user are injected; the page owns all view state
/// and is driven through `&mut self`.
pub struct MessagingPage {
    backend: Arc<dyn Backend>,
    user: CurrentUser,
    config: ChatConfig,
    selection: SelectionState,
    messages: MessageList,
    realtime: RealtimeListener,
    effects: Vec<ViewEffect>,
}

impl MessagingPage {
    pub fn new(backend: Arc<dyn Backend>, user: CurrentUser, config: ChatConfig) -> Self {
        let messages = MessageList::new(config.local_offset);
        Self {
            backend,
            user,
            config,
            selection: SelectionState::new(),
            messages,
            realtime: RealtimeListener::new(),
            effects: Vec::new(),
        }
    }

    pub fn user(&self) -> &CurrentUser {
        &self.user
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn messages(&self) -> &MessageList {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageList {
        &mut self.messages
    }

    pub fn realtime(&self) -> &RealtimeListener {
        &self.realtime
    }

    /// Drains pending renderer side effects, page-level ones first.
    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        let mut effects = mem::take(&mut self.effects);
        effects.extend(self.messages.take_effects());
        effects
    }

    /// Initial load: grouping list, then the first grouping if nothing is
    /// selected yet.
    pub async fn load(&mut self) {
        let result = queries::groupings(self.backend.as_ref()).await;
        if let Some(first) = self.selection.apply_groupings(result) {
            self.select_grouping(first).await;
        }
    }

    pub async fn select_grouping(&mut self, grouping: ProjectGrouping) {
        info!("Opening project grouping '{}'", grouping);

        self.selection.begin_select_grouping(grouping.clone());
        self.messages.reset(None);
        self.realtime.stop_messages();
        self.realtime
            .watch_grouping(self.backend.as_ref(), &grouping)
            .await;

        self.load_channels(grouping).await;
    }

    pub async fn select_channel(&mut self, channel: Channel) {
        let channel_id = channel.id;
        if !self.selection.select_channel(channel) {
            return;
        }

        self.messages.reset(Some(channel_id));
        self.realtime
            .watch_channel(self.backend.as_ref(), channel_id)
            .await;

        let Some(fetch) = self.messages.begin_fetch() else {
            return;
        };
        let result =
            queries::messages(self.backend.as_ref(), channel_id, self.config.message_limit).await;
        self.messages.apply_messages(fetch, result);
    }

    /// Re-fetches the channel list of the active grouping.
    pub async fn refresh_channels(&mut self) {
        if let Some(grouping) = self.selection.begin_refresh() {
            self.load_channels(grouping).await;
        }
    }

    async fn load_channels(&mut self, grouping: ProjectGrouping) {
        let result = queries::channels(self.backend.as_ref(), &grouping).await;
        match self.selection.apply_channels(&grouping, result) {
            ChannelChange::Selected(channel) => self.select_channel(channel).await,
            ChannelChange::Cleared => {
                self.messages.reset(None);
                self.realtime.stop_messages();
            }
            ChannelChange::Kept | ChannelChange::Ignored => {}
        }

        if self.selection.active_channel().is_none()
            && self.selection.channels_state() == LoadState::Empty
        {
            self.messages.settle_without_channel();
        }
    }

    /// Sends `text` to the open channel as the current user, optimistically.
    pub async fn send_message(&mut self, text: &str) -> Result<(), ChatError> {
        let pending = self.messages.begin_send(
            self.selection.active_channel_id(),
            Sender::from_user(&self.user),
            text,
        )?;
        debug!("Sending {} to channel {}", pending.temp_id, pending.channel_id);

        let result = queries::insert_message(self.backend.as_ref(), pending.to_new_message()).await;
        self.messages.complete_send(&pending, result)
    }

    /// Creates a regular channel in the active grouping.
    pub async fn create_channel(
        &mut self,
        name: &str,
        card_id: Option<Uuid>,
    ) -> Result<Channel, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::BlankChannelName);
        }
        let grouping = self
            .selection
            .active_grouping()
            .cloned()
            .ok_or(ChatError::NoGrouping)?;

        let new = NewChannel {
            project_name: grouping,
            name: name.to_string(),
            card_id,
        };
        match queries::insert_channel(self.backend.as_ref(), new).await {
            Ok(channel) => {
                info!("Created channel {} ({})", channel.name, channel.id);
                self.refresh_channels().await;
                Ok(channel)
            }
            Err(e) => {
                warn!("Failed to create channel '{}': {}", name, e);
                self.effects
                    .push(ViewEffect::Alert(format!("Could not create channel: {}", e)));
                Err(e)
            }
        }
    }

    /// Soft-deletes a channel of the current list. The pinned default channel
    /// stays.
    pub async fn delete_channel(&mut self, channel_id: Uuid) -> Result<(), ChatError> {
        let channel = self
            .selection
            .channel(channel_id)
            .ok_or(ChatError::UnknownChannel(channel_id))?;
        if channel.is_default {
            return Err(ChatError::DefaultChannelLocked);
        }

        match queries::soft_delete_channel(self.backend.as_ref(), channel_id).await {
            Ok(_) => {
                info!("Deleted channel {}", channel_id);
                self.refresh_channels().await;
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete channel {}: {}", channel_id, e);
                self.effects
                    .push(ViewEffect::Alert(format!("Could not delete channel: {}", e)));
                Err(e.into())
            }
        }
    }

    /// Waits for one realtime notification and applies it. Returns false when
    /// nothing is being watched any more.
    pub async fn next_event(&mut self) -> bool {
        match self.realtime.next().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Applies every notification already delivered, without waiting for
    /// more. Returns how many were handled.
    pub async fn drain_realtime(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.realtime.try_next() {
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    pub async fn handle_event(&mut self, event: RealtimeEvent) {
        match event {
            RealtimeEvent::MessageInserted(record) => self.on_message_inserted(record).await,
            RealtimeEvent::ChannelInserted(record) => {
                debug!("Channel inserted: {:?}", record.get("name"));
                self.refresh_channels().await;
            }
        }
    }

    async fn on_message_inserted(&mut self, record: Record) {
        let (Some(id), Some(channel_id)) =
            (record_uuid(&record, "id"), record_uuid(&record, "channel_id"))
        else {
            warn!("Ignoring message notification without ids");
            return;
        };

        if self.messages.channel_id() != Some(channel_id) || self.messages.contains(id) {
            return;
        }

        if record_uuid(&record, "sender_id") == Some(self.user.id) {
            if self.messages.has_pending() {
                // The pending entry reconciles to this record.
                return;
            }
            match self.config.self_echo {
                SelfEchoPolicy::Ignore => {
                    warn!(
                        "Own message {} is neither shown nor pending; it appears after a reload",
                        id
                    );
                    return;
                }
                SelfEchoPolicy::RecoverUnmatched => {
                    info!("Recovering own message {} from realtime", id);
                }
            }
        }

        match queries::message(self.backend.as_ref(), id).await {
            Ok(Some(message)) => {
                self.messages.append_remote(message);
            }
            Ok(None) => warn!("Notified message {} could not be found", id),
            Err(e) => warn!("Failed to resolve notified message {}: {}", id, e),
        }
    }
}
