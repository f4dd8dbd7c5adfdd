use tracing::{debug, warn};
use uuid::Uuid;

use landingos_types::models::{Channel, ProjectGrouping};

use crate::view::LoadState;

/// Default channel first, then creation order. Soft-deleted channels are
/// dropped. The sort is stable, so equal timestamps keep arrival order.
pub fn order_channels(mut channels: Vec<Channel>) -> Vec<Channel> {
    channels.retain(|c| !c.is_deleted());
    channels.sort_by_key(|c| (!c.is_default, c.created_at));
    channels
}

/// Channel to open when a list arrives and nothing valid is selected.
pub fn pick_initial(channels: &[Channel]) -> Option<&Channel> {
    channels
        .iter()
        .find(|c| c.is_default)
        .or_else(|| channels.first())
}

/// Outcome of applying a channel list to the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelChange {
    /// Response was stale or failed; nothing changed.
    Ignored,
    /// Active channel is still valid.
    Kept,
    /// A new channel became active; its messages must be loaded.
    Selected(Channel),
    /// The grouping has no channels left.
    Cleared,
}

/// Which grouping and channel are active, and the channel list shown for the
/// grouping.
#[derive(Debug, Default)]
pub struct SelectionState {
    groupings: Vec<ProjectGrouping>,
    active_grouping: Option<ProjectGrouping>,
    channels: Vec<Channel>,
    channels_state: LoadState,
    active_channel: Option<Channel>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groupings(&self) -> &[ProjectGrouping] {
        &self.groupings
    }

    pub fn active_grouping(&self) -> Option<&ProjectGrouping> {
        self.active_grouping.as_ref()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_state(&self) -> LoadState {
        self.channels_state
    }

    pub fn active_channel(&self) -> Option<&Channel> {
        self.active_channel.as_ref()
    }

    pub fn active_channel_id(&self) -> Option<Uuid> {
        self.active_channel.as_ref().map(|c| c.id)
    }

    pub fn channel(&self, id: Uuid) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Stores the grouping list. Returns the grouping to auto-select when
    /// none is active yet. A failed fetch leaves everything as it was.
    pub fn apply_groupings<E: std::fmt::Display>(
        &mut self,
        result: Result<Vec<ProjectGrouping>, E>,
    ) -> Option<ProjectGrouping> {
        match result {
            Ok(groupings) => {
                self.groupings = groupings;
                if self.active_grouping.is_none() {
                    self.groupings.first().cloned()
                } else {
                    None
                }
            }
            Err(e) => {
                warn!("Failed to load project groupings: {}", e);
                None
            }
        }
    }

    /// Switches grouping: channel list and active channel are cleared until
    /// the new list arrives.
    pub fn begin_select_grouping(&mut self, grouping: ProjectGrouping) {
        debug!("Selecting grouping '{}'", grouping);
        self.active_grouping = Some(grouping);
        self.channels.clear();
        self.active_channel = None;
        self.channels_state = LoadState::Loading;
    }

    /// Marks a re-fetch of the current grouping. The visible list stays put.
    pub fn begin_refresh(&mut self) -> Option<ProjectGrouping> {
        self.active_grouping.clone()
    }

    /// Applies a channel list fetched for `origin`. Responses for a grouping
    /// that is no longer active are discarded.
    pub fn apply_channels<E: std::fmt::Display>(
        &mut self,
        origin: &ProjectGrouping,
        result: Result<Vec<Channel>, E>,
    ) -> ChannelChange {
        if self.active_grouping.as_ref() != Some(origin) {
            debug!("Discarding channel list for stale grouping '{}'", origin);
            return ChannelChange::Ignored;
        }

        let channels = match result {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Failed to load channels for '{}': {}", origin, e);
                self.channels_state = LoadState::settled(!self.channels.is_empty());
                return ChannelChange::Ignored;
            }
        };

        self.channels = order_channels(channels);
        self.channels_state = LoadState::settled(!self.channels.is_empty());

        if let Some(active) = self.active_channel.as_ref() {
            if let Some(fresh) = self.channels.iter().find(|c| c.id == active.id) {
                self.active_channel = Some(fresh.clone());
                return ChannelChange::Kept;
            }
        }

        match pick_initial(&self.channels).cloned() {
            Some(channel) => {
                self.active_channel = Some(channel.clone());
                ChannelChange::Selected(channel)
            }
            None => {
                let had_channel = self.active_channel.take().is_some();
                if had_channel {
                    ChannelChange::Cleared
                } else {
                    ChannelChange::Kept
                }
            }
        }
    }

    /// Makes `channel` active. Returns false when it does not belong to the
    /// active grouping.
    pub fn select_channel(&mut self, channel: Channel) -> bool {
        if self.active_grouping.as_ref() != Some(&channel.project_name) {
            warn!(
                "Channel {} belongs to '{}', not the active grouping",
                channel.id, channel.project_name
            );
            return false;
        }
        debug!("Selecting channel {} ({})", channel.name, channel.id);
        self.active_channel = Some(channel);
        true
    }
}
