use serde::Deserialize;
use serde_json::Value;

use crate::Record;

/// Kind of row change carried by a realtime notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
}

/// A change notification pushed by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// The row as written. Relations are never expanded here.
    pub record: Record,
}

/// What a subscriber wants to hear about: one table, one change kind, and a
/// single column-equality predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionTopic {
    pub table: String,
    pub kind: ChangeKind,
    pub column: String,
    pub value: Value,
}

impl SubscriptionTopic {
    pub fn inserts(table: &str, column: &str, value: impl Into<Value>) -> Self {
        Self {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table
            && event.kind == self.kind
            && event.record.get(&self.column) == Some(&self.value)
    }
}
