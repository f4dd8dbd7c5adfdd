use std::fmt;

use chrono::{FixedOffset, NaiveDate};
use uuid::Uuid;

use landingos_types::models::{CurrentUser, Message};

/// Locally generated identifier of a message that has not been acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempId(Uuid);

impl TempId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp-{}", self.0)
    }
}

/// One row of the message pane. The calendar day is fixed when the entry is
/// built and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEntry {
    Pending {
        temp_id: TempId,
        message: Message,
        day: NaiveDate,
    },
    Confirmed {
        message: Message,
        day: NaiveDate,
    },
}

fn local_day(message: &Message, offset: FixedOffset) -> NaiveDate {
    message.created_at.with_timezone(&offset).date_naive()
}

impl MessageEntry {
    /// `message.id` carries the temporary id until reconciliation.
    pub fn pending(temp_id: TempId, message: Message, offset: FixedOffset) -> Self {
        let day = local_day(&message, offset);
        Self::Pending {
            temp_id,
            message,
            day,
        }
    }

    pub fn confirmed(message: Message, offset: FixedOffset) -> Self {
        let day = local_day(&message, offset);
        Self::Confirmed { message, day }
    }

    pub fn message(&self) -> &Message {
        match self {
            Self::Pending { message, .. } | Self::Confirmed { message, .. } => message,
        }
    }

    pub fn day(&self) -> NaiveDate {
        match self {
            Self::Pending { day, .. } | Self::Confirmed { day, .. } => *day,
        }
    }

    pub fn temp_id(&self) -> Option<TempId> {
        match self {
            Self::Pending { temp_id, .. } => Some(*temp_id),
            Self::Confirmed { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Server identifier, once there is one.
    pub fn confirmed_id(&self) -> Option<Uuid> {
        match self {
            Self::Pending { .. } => None,
            Self::Confirmed { message, .. } => Some(message.id),
        }
    }

    /// Whether the entry renders on the admin side of the pane. Affects
    /// alignment only.
    pub fn is_admin_side(&self, user: &CurrentUser) -> bool {
        self.is_pending()
            || self.message().sender_id() == user.id
            || self.message().sender.is_admin()
    }
}
