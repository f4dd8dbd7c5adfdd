use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Free-text label shared by a set of client accounts and their channels.
/// Lookups compare it byte-for-byte, so no normalisation happens here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectGrouping(String);

impl ProjectGrouping {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated admin driving the messaging page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub avatar_url: Option<String>,
}

impl Sender {
    pub fn unnamed(id: Uuid) -> Self {
        Self {
            id,
            full_name: None,
            role: None,
            avatar_url: None,
        }
    }

    pub fn from_user(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            full_name: Some(user.full_name.clone()),
            role: Some("admin".into()),
            avatar_url: None,
        }
    }

    /// Role marker set on back-office accounts.
    pub fn is_admin(&self) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| role.eq_ignore_ascii_case("admin"))
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Uuid,
    pub project_name: ProjectGrouping,
    pub name: String,
    /// Pinned "general" channel of the grouping.
    pub is_default: bool,
    /// Optional link to a specific project card.
    pub card_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Channel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Message type tag. Only plain text is produced locally; anything else the
/// backend reports is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Text,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        match tag {
            "" | "text" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender: Sender,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn sender_id(&self) -> Uuid {
        self.sender.id
    }
}
