use std::mem;

use chrono::{FixedOffset, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use landingos_types::models::{Message, MessageKind, Sender};
use landingos_types::records::NewMessage;

use crate::entry::{MessageEntry, TempId};
use crate::error::SendRejected;
use crate::grouping::{DayBucket, group_by_day};
use crate::view::{LoadState, ViewEffect};

/// Fetch issued for one channel. Carries its origin so a late response for a
/// channel that is no longer open can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageFetch {
    pub channel_id: Uuid,
}

/// A provisional message waiting for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub temp_id: TempId,
    pub channel_id: Uuid,
    pub text: String,
    pub sender_id: Uuid,
}

impl PendingSend {
    pub fn to_new_message(&self) -> NewMessage {
        NewMessage {
            channel_id: self.channel_id,
            sender_id: self.sender_id,
            content: self.text.clone(),
            kind: MessageKind::Text,
        }
    }
}

/// Message sequence of the open channel, plus the compose field feeding it.
///
/// Every async step is split into a begin half, which updates the view
/// synchronously, and an apply/complete half, which takes the backend's
/// answer. Callers await the backend in between.
#[derive(Debug)]
pub struct MessageList {
    channel_id: Option<Uuid>,
    entries: Vec<MessageEntry>,
    state: LoadState,
    compose: String,
    in_flight: Option<TempId>,
    effects: Vec<ViewEffect>,
    offset: FixedOffset,
}

impl MessageList {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            channel_id: None,
            entries: Vec::new(),
            state: LoadState::Unselected,
            compose: String::new(),
            in_flight: None,
            effects: Vec::new(),
            offset,
        }
    }

    pub fn channel_id(&self) -> Option<Uuid> {
        self.channel_id
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn compose(&self) -> &str {
        &self.compose
    }

    pub fn set_compose(&mut self, text: impl Into<String>) {
        self.compose = text.into();
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(MessageEntry::is_pending)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.confirmed_id() == Some(id))
    }

    pub fn days(&self) -> Vec<DayBucket<'_>> {
        group_by_day(&self.entries)
    }

    pub fn take_effects(&mut self) -> Vec<ViewEffect> {
        mem::take(&mut self.effects)
    }

    /// Discards the sequence and points the list at `channel_id`. An
    /// outstanding send keeps its slot until it completes.
    pub fn reset(&mut self, channel_id: Option<Uuid>) {
        self.channel_id = channel_id;
        self.entries.clear();
        self.state = match channel_id {
            Some(_) => LoadState::Loading,
            None => LoadState::Unselected,
        };
    }

    /// The grouping has no channel to open: nothing is selected and the pane
    /// shows its empty state.
    pub fn settle_without_channel(&mut self) {
        self.reset(None);
        self.state = LoadState::Empty;
    }

    pub fn begin_fetch(&mut self) -> Option<MessageFetch> {
        let channel_id = self.channel_id?;
        self.state = LoadState::Loading;
        Some(MessageFetch { channel_id })
    }

    /// Replaces the sequence with a fetched page. Stale and failed responses
    /// leave the sequence untouched. Returns whether the response was applied.
    pub fn apply_messages<E: std::fmt::Display>(
        &mut self,
        fetch: MessageFetch,
        result: Result<Vec<Message>, E>,
    ) -> bool {
        if self.channel_id != Some(fetch.channel_id) {
            debug!("Discarding messages for stale channel {}", fetch.channel_id);
            return false;
        }

        match result {
            Ok(messages) => {
                self.entries = messages
                    .into_iter()
                    .map(|m| MessageEntry::confirmed(m, self.offset))
                    .collect();
                self.state = LoadState::settled(!self.entries.is_empty());
                self.effects.push(ViewEffect::ScrollToEnd);
                debug!(
                    "Loaded {} messages for channel {}",
                    self.entries.len(),
                    fetch.channel_id
                );
                true
            }
            Err(e) => {
                warn!("Failed to load messages for {}: {}", fetch.channel_id, e);
                self.state = LoadState::settled(!self.entries.is_empty());
                false
            }
        }
    }

    /// Validates a send and appends the provisional entry. Nothing is
    /// appended when this returns an error.
    pub fn begin_send(
        &mut self,
        channel_id: Option<Uuid>,
        sender: Sender,
        text: &str,
    ) -> Result<PendingSend, SendRejected> {
        if text.trim().is_empty() {
            return Err(SendRejected::EmptyText);
        }
        let channel_id = match (channel_id, self.channel_id) {
            (Some(requested), Some(open)) if requested == open => open,
            _ => return Err(SendRejected::NoChannel),
        };
        if self.in_flight.is_some() {
            return Err(SendRejected::InFlight);
        }

        let temp_id = TempId::generate();
        let sender_id = sender.id;
        let message = Message {
            id: temp_id.as_uuid(),
            channel_id,
            sender,
            content: text.to_string(),
            kind: MessageKind::Text,
            created_at: Utc::now(),
        };

        self.entries
            .push(MessageEntry::pending(temp_id, message, self.offset));
        self.state = LoadState::Ready;
        self.compose.clear();
        self.in_flight = Some(temp_id);
        self.effects.push(ViewEffect::ScrollToEnd);

        Ok(PendingSend {
            temp_id,
            channel_id,
            text: text.to_string(),
            sender_id,
        })
    }

    /// Reconciles a provisional entry with the backend's answer.
    ///
    /// On success the entry is replaced in place. On failure it is removed
    /// and the text goes back into the compose field.
    pub fn complete_send<E: std::fmt::Display>(
        &mut self,
        pending: &PendingSend,
        result: Result<Message, E>,
    ) -> Result<(), E> {
        if self.in_flight == Some(pending.temp_id) {
            self.in_flight = None;
        }

        let position = self
            .entries
            .iter()
            .position(|e| e.temp_id() == Some(pending.temp_id));

        match result {
            Ok(message) => {
                let Some(position) = position else {
                    debug!("Send {} confirmed after its channel was closed", pending.temp_id);
                    return Ok(());
                };
                if self.contains(message.id) {
                    // Already delivered by another path; drop the duplicate.
                    self.entries.remove(position);
                } else {
                    self.entries[position] = MessageEntry::confirmed(message, self.offset);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Send {} failed: {}", pending.temp_id, e);
                if let Some(position) = position {
                    self.entries.remove(position);
                }
                if self.entries.is_empty() && self.state == LoadState::Ready {
                    self.state = LoadState::Empty;
                }
                self.compose = pending.text.clone();
                self.effects
                    .push(ViewEffect::RestoreCompose(pending.text.clone()));
                Err(e)
            }
        }
    }

    /// Appends a message delivered by realtime. Returns false when it belongs
    /// to another channel or is already shown.
    pub fn append_remote(&mut self, message: Message) -> bool {
        if self.channel_id != Some(message.channel_id) {
            debug!("Dropping message {} for inactive channel", message.id);
            return false;
        }
        if self.contains(message.id) {
            return false;
        }

        info!("New message {} in channel {}", message.id, message.channel_id);
        self.entries
            .push(MessageEntry::confirmed(message, self.offset));
        self.state = LoadState::Ready;
        self.effects.push(ViewEffect::ScrollToEnd);
        true
    }
}
