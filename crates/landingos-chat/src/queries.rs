//! Backend round trips of the messaging flow, returning typed entities.

use chrono::Utc;
use uuid::Uuid;

use landingos_backend::{Backend, BackendError};
use landingos_types::models::{Channel, Message, ProjectGrouping};
use landingos_types::query::{Filter, Query, Selector, tables};
use landingos_types::records::{
    NewChannel, NewMessage, decode_rows, grouping_from_record, soft_delete_fields,
};

use crate::error::ChatError;

const MESSAGE_COLUMNS: &[&str] = &[
    "id",
    "channel_id",
    "sender_id",
    "content",
    "message_type",
    "created_at",
];

const CHANNEL_COLUMNS: &[&str] = &[
    "id",
    "project_name",
    "name",
    "is_default",
    "card_id",
    "created_at",
    "deleted_at",
];

fn message_query() -> Query {
    Query::from(tables::CHAT_MESSAGES)
        .columns(MESSAGE_COLUMNS)
        .select(Selector::message_sender())
}

fn message_returning() -> Vec<Selector> {
    message_query().select
}

/// Distinct non-null groupings across client profiles, ascending. The first
/// occurrence of each label wins.
pub async fn groupings(backend: &dyn Backend) -> Result<Vec<ProjectGrouping>, BackendError> {
    let rows = backend
        .select(
            &Query::from(tables::CLIENT_PROFILES)
                .columns(&["project_name"])
                .filter(Filter::not_null("project_name"))
                .order_by("project_name", true),
        )
        .await?;

    let mut groupings: Vec<ProjectGrouping> = Vec::new();
    for grouping in rows.iter().filter_map(grouping_from_record) {
        if !groupings.contains(&grouping) {
            groupings.push(grouping);
        }
    }
    Ok(groupings)
}

/// Live channels of a grouping in creation order. Pinning the default channel
/// is up to the caller.
pub async fn channels(
    backend: &dyn Backend,
    grouping: &ProjectGrouping,
) -> Result<Vec<Channel>, BackendError> {
    let rows = backend
        .select(
            &Query::from(tables::CHAT_CHANNELS)
                .columns(CHANNEL_COLUMNS)
                .filter(Filter::eq("project_name", grouping.as_str()))
                .filter(Filter::is_null("deleted_at"))
                .order_by("created_at", true),
        )
        .await?;
    Ok(decode_rows(rows))
}

/// The `limit` most recent messages of a channel, oldest first.
pub async fn messages(
    backend: &dyn Backend,
    channel_id: Uuid,
    limit: usize,
) -> Result<Vec<Message>, BackendError> {
    let rows = backend
        .select(
            &message_query()
                .filter(Filter::eq("channel_id", channel_id.to_string()))
                .order_by("created_at", false)
                .limit(limit),
        )
        .await?;

    let mut messages: Vec<Message> = decode_rows(rows);
    messages.reverse();
    Ok(messages)
}

/// One message with its sender fields resolved.
pub async fn message(backend: &dyn Backend, id: Uuid) -> Result<Option<Message>, BackendError> {
    let rows = backend
        .select(
            &message_query()
                .filter(Filter::eq("id", id.to_string()))
                .limit(1),
        )
        .await?;
    Ok(decode_rows(rows).into_iter().next())
}

pub async fn insert_message(backend: &dyn Backend, new: NewMessage) -> Result<Message, ChatError> {
    let row = backend
        .insert(tables::CHAT_MESSAGES, new.into_record(), &message_returning())
        .await?;
    Ok(Message::try_from(row)?)
}

pub async fn insert_channel(backend: &dyn Backend, new: NewChannel) -> Result<Channel, ChatError> {
    let row = backend
        .insert(tables::CHAT_CHANNELS, new.into_record(), &[])
        .await?;
    Ok(Channel::try_from(row)?)
}

pub async fn soft_delete_channel(backend: &dyn Backend, id: Uuid) -> Result<usize, BackendError> {
    backend
        .update(
            tables::CHAT_CHANNELS,
            soft_delete_fields(Utc::now()),
            &Filter::eq("id", id.to_string()),
        )
        .await
}
