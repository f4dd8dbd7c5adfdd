//! Typed decoding of backend rows.
//!
//! Rows arrive as JSON objects whose shape depends on which columns and
//! relations were requested. Everything is mapped onto the explicit entity
//! types in [`crate::models`] here, with defaults for optional fields, so the
//! rest of the workspace never inspects raw maps.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::Record;
use crate::models::{Channel, Message, MessageKind, ProjectGrouping, Sender};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("malformed {entity} record: {source}")]
    Malformed {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} record has no {field}")]
    Missing {
        entity: &'static str,
        field: &'static str,
    },
}

/// Accepts RFC 3339 as well as the zone-less `YYYY-MM-DD HH:MM:SS[.fff]`
/// form some backends emit, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn de_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

fn de_opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw))),
    }
}

fn decode<T: DeserializeOwned>(entity: &'static str, record: Record) -> Result<T, RecordError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|source| RecordError::Malformed { entity, source })
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[derive(Deserialize)]
struct ChannelRow {
    id: Uuid,
    #[serde(default)]
    project_name: Option<String>,
    name: String,
    #[serde(default)]
    is_default: Option<bool>,
    #[serde(default)]
    card_id: Option<Uuid>,
    #[serde(deserialize_with = "de_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<Record> for Channel {
    type Error = RecordError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let row: ChannelRow = decode("channel", record)?;
        let project_name = row.project_name.ok_or(RecordError::Missing {
            entity: "channel",
            field: "project_name",
        })?;

        Ok(Channel {
            id: row.id,
            project_name: ProjectGrouping::new(project_name),
            name: row.name,
            is_default: row.is_default.unwrap_or(false),
            card_id: row.card_id,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Deserialize)]
struct MessageRow {
    id: Uuid,
    channel_id: Uuid,
    sender_id: Uuid,
    content: String,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(deserialize_with = "de_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    sender: Option<Value>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SenderRow {
    full_name: Option<String>,
    role: Option<String>,
    avatar_url: Option<String>,
}

/// The expanded relation may be an object, a one-element array, or absent.
fn decode_sender(id: Uuid, embedded: Option<Value>) -> Sender {
    let embedded = match embedded {
        Some(Value::Array(items)) => items.into_iter().next(),
        other => other,
    };

    match embedded {
        None | Some(Value::Null) => Sender::unnamed(id),
        Some(value) => match serde_json::from_value::<SenderRow>(value) {
            Ok(row) => Sender {
                id,
                full_name: row.full_name,
                role: row.role,
                avatar_url: row.avatar_url,
            },
            Err(e) => {
                warn!("Ignoring malformed sender expansion for {}: {}", id, e);
                Sender::unnamed(id)
            }
        },
    }
}

impl TryFrom<Record> for Message {
    type Error = RecordError;

    fn try_from(record: Record) -> Result<Self, Self::Error> {
        let row: MessageRow = decode("message", record)?;

        Ok(Message {
            id: row.id,
            channel_id: row.channel_id,
            sender: decode_sender(row.sender_id, row.sender),
            content: row.content,
            kind: row
                .message_type
                .as_deref()
                .map(MessageKind::from)
                .unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

/// Grouping label of a client profile row. Null and blank labels yield `None`.
pub fn grouping_from_record(record: &Record) -> Option<ProjectGrouping> {
    record
        .get("project_name")
        .and_then(Value::as_str)
        .filter(|label| !label.trim().is_empty())
        .map(ProjectGrouping::new)
}

/// Decodes every row it can and logs the ones it cannot; a single bad row
/// never empties a list.
pub fn decode_rows<T>(rows: Vec<Record>) -> Vec<T>
where
    T: TryFrom<Record, Error = RecordError>,
{
    rows.into_iter()
        .filter_map(|row| match T::try_from(row) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping row: {}", e);
                None
            }
        })
        .collect()
}

/// Fields of a message about to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
}

impl NewMessage {
    pub fn into_record(self) -> Record {
        object(json!({
            "channel_id": self.channel_id,
            "sender_id": self.sender_id,
            "content": self.content,
            "message_type": self.kind.as_str(),
        }))
    }
}

/// Fields of a channel created from the admin surface. Such channels are
/// never the pinned default.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub project_name: ProjectGrouping,
    pub name: String,
    pub card_id: Option<Uuid>,
}

impl NewChannel {
    pub fn into_record(self) -> Record {
        object(json!({
            "project_name": self.project_name,
            "name": self.name,
            "is_default": false,
            "card_id": self.card_id,
        }))
    }
}

pub fn soft_delete_fields(at: DateTime<Utc>) -> Record {
    object(json!({ "deleted_at": at.to_rfc3339() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> Record {
        object(value)
    }

    #[test]
    fn channel_defaults_optional_fields() {
        let id = Uuid::new_v4();
        let channel = Channel::try_from(record(json!({
            "id": id,
            "project_name": "Clínica Dental",
            "name": "Reunião",
            "is_default": null,
            "created_at": "2024-03-01T10:00:00Z",
        })))
        .unwrap();

        assert_eq!(channel.id, id);
        assert!(!channel.is_default);
        assert!(channel.card_id.is_none());
        assert!(!channel.is_deleted());
    }

    #[test]
    fn channel_without_grouping_is_rejected() {
        let err = Channel::try_from(record(json!({
            "id": Uuid::new_v4(),
            "project_name": null,
            "name": "Orphan",
            "created_at": "2024-03-01T10:00:00Z",
        })))
        .unwrap_err();

        assert!(matches!(err, RecordError::Missing { field: "project_name", .. }));
    }

    #[test]
    fn message_accepts_array_expansion() {
        let sender_id = Uuid::new_v4();
        let message = Message::try_from(record(json!({
            "id": Uuid::new_v4(),
            "channel_id": Uuid::new_v4(),
            "sender_id": sender_id,
            "content": "Olá",
            "message_type": "text",
            "created_at": "2024-03-01 10:00:00",
            "sender": [{ "full_name": "Ana", "role": "client", "avatar_url": null }],
        })))
        .unwrap();

        assert_eq!(message.sender.id, sender_id);
        assert_eq!(message.sender.display_name(), "Ana");
        assert_eq!(message.kind, MessageKind::Text);
    }

    #[test]
    fn malformed_expansion_falls_back_to_unnamed_sender() {
        let sender_id = Uuid::new_v4();
        let message = Message::try_from(record(json!({
            "id": Uuid::new_v4(),
            "channel_id": Uuid::new_v4(),
            "sender_id": sender_id,
            "content": "Olá",
            "created_at": "2024-03-01T10:00:00+00:00",
            "sender": "not an object",
        })))
        .unwrap();

        assert_eq!(message.sender, Sender::unnamed(sender_id));
    }

    #[test]
    fn zone_less_timestamps_read_as_utc() {
        let parsed = parse_timestamp("2024-03-01 10:00:00.250").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T10:00:00.250+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn decode_rows_skips_bad_rows() {
        let good = record(json!({
            "id": Uuid::new_v4(),
            "project_name": "Loja",
            "name": "Geral",
            "created_at": "2024-03-01T10:00:00Z",
        }));
        let bad = record(json!({ "id": "not-a-uuid" }));

        let channels: Vec<Channel> = decode_rows(vec![bad, good]);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Geral");
    }

    #[test]
    fn blank_groupings_are_ignored() {
        assert!(grouping_from_record(&record(json!({ "project_name": null }))).is_none());
        assert!(grouping_from_record(&record(json!({ "project_name": "  " }))).is_none());
        assert_eq!(
            grouping_from_record(&record(json!({ "project_name": "Loja" }))),
            Some(ProjectGrouping::new("Loja"))
        );
    }
}
