use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use landingos_types::Record;
use landingos_types::events::{ChangeEvent, ChangeKind, SubscriptionTopic};
use landingos_types::query::{Filter, Order, Query, Selector};
use landingos_types::records::parse_timestamp;

use crate::{Backend, BackendError, RealtimeHub, Subscription};

static NULL: Value = Value::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Subscribe,
}

#[derive(Debug, Clone)]
struct FailPoint {
    op: Operation,
    table: String,
    after_write: bool,
}

/// In-process implementation of the backend contract over loosely-typed
/// rows. Inserts and updates are pushed to subscribers through a
/// [`RealtimeHub`] the same way a hosted backend would.
///
/// Also records every call and supports one-shot failure injection.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    hub: RealtimeHub,
    fail_points: Mutex<Vec<FailPoint>>,
    calls: Mutex<Vec<(Operation, String)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn injected(table: &str) -> BackendError {
    BackendError::Request {
        table: table.to_string(),
        message: "injected failure".into(),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    /// Stores a row without notifying anyone. Missing `id` and `created_at`
    /// are generated. Returns the stored row.
    pub fn seed(&self, table: &str, mut record: Record) -> Record {
        fill_defaults(&mut record);
        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.tables).get(table).cloned().unwrap_or_default()
    }

    /// The next `op` on `table` fails before touching any data.
    pub fn fail_next(&self, op: Operation, table: &str) {
        lock(&self.fail_points).push(FailPoint {
            op,
            table: table.to_string(),
            after_write: false,
        });
    }

    /// The next insert into `table` is stored and announced, but the caller
    /// still gets an error, as with a response lost after a successful write.
    pub fn fail_after_write(&self, table: &str) {
        lock(&self.fail_points).push(FailPoint {
            op: Operation::Insert,
            table: table.to_string(),
            after_write: true,
        });
    }

    pub fn calls(&self) -> Vec<(Operation, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        lock(&self.calls).iter().filter(|(o, _)| *o == op).count()
    }

    fn begin(&self, op: Operation, table: &str) -> Option<FailPoint> {
        lock(&self.calls).push((op, table.to_string()));

        let mut fail_points = lock(&self.fail_points);
        let position = fail_points
            .iter()
            .position(|fp| fp.op == op && fp.table == table)?;
        Some(fail_points.remove(position))
    }
}

fn fill_defaults(record: &mut Record) {
    record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    record.entry("created_at").or_insert_with(|| {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
    });
}

fn matches(filter: &Filter, record: &Record) -> bool {
    let field = record.get(filter.column()).filter(|v| !v.is_null());
    match filter {
        Filter::Eq(_, value) => field == Some(value),
        Filter::NotNull(_) => field.is_some(),
        Filter::IsNull(_) => field.is_none(),
        Filter::In(_, values) => field.is_some_and(|f| values.contains(f)),
    }
}

/// Nulls sort last ascending; timestamps compare as instants.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            _ => x.cmp(y),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn compare_rows(a: &Record, b: &Record, order: &[Order]) -> Ordering {
    for clause in order {
        let ord = compare(
            a.get(&clause.column).unwrap_or(&NULL),
            b.get(&clause.column).unwrap_or(&NULL),
        );
        let ord = if clause.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project(tables: &HashMap<String, Vec<Record>>, row: &Record, select: &[Selector]) -> Record {
    if select.is_empty() {
        return row.clone();
    }

    let mut out = Record::new();
    for selector in select {
        match selector {
            Selector::Column(name) if name == "*" => {
                out.extend(row.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Selector::Column(name) => {
                if let Some(value) = row.get(name) {
                    out.insert(name.clone(), value.clone());
                }
            }
            Selector::Expand {
                alias,
                table,
                foreign_key,
                columns,
            } => {
                let related = row
                    .get(foreign_key)
                    .filter(|key| !key.is_null())
                    .and_then(|key| {
                        tables
                            .get(table)?
                            .iter()
                            .find(|candidate| candidate.get("id") == Some(key))
                    });

                let value = match related {
                    Some(related) => Value::Object(
                        columns
                            .iter()
                            .filter_map(|c| related.get(c).map(|v| (c.clone(), v.clone())))
                            .collect(),
                    ),
                    None => Value::Null,
                };
                out.insert(alias.clone(), value);
            }
        }
    }
    out
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, BackendError> {
        if self.begin(Operation::Select, &query.table).is_some() {
            return Err(injected(&query.table));
        }

        let tables = lock(&self.tables);
        let mut rows: Vec<&Record> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(f, row)))
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        debug!("select {} -> {} rows", query.table, rows.len());
        Ok(rows
            .into_iter()
            .map(|row| project(&tables, row, &query.select))
            .collect())
    }

    async fn insert(
        &self,
        table: &str,
        mut fields: Record,
        returning: &[Selector],
    ) -> Result<Record, BackendError> {
        let fail_point = self.begin(Operation::Insert, table);
        if fail_point.as_ref().is_some_and(|fp| !fp.after_write) {
            return Err(injected(table));
        }

        fill_defaults(&mut fields);
        let projected = {
            let mut tables = lock(&self.tables);
            tables
                .entry(table.to_string())
                .or_default()
                .push(fields.clone());
            project(&tables, &fields, returning)
        };

        self.hub.publish(&ChangeEvent {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            record: fields,
        });

        if fail_point.is_some() {
            warn!("Dropping response for committed insert into {}", table);
            return Err(injected(table));
        }
        Ok(projected)
    }

    async fn update(
        &self,
        table: &str,
        fields: Record,
        filter: &Filter,
    ) -> Result<usize, BackendError> {
        if self.begin(Operation::Update, table).is_some() {
            return Err(injected(table));
        }

        let updated: Vec<Record> = {
            let mut tables = lock(&self.tables);
            tables
                .get_mut(table)
                .map(|rows| {
                    rows.iter_mut()
                        .filter(|row| matches(filter, row))
                        .map(|row| {
                            row.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                            row.clone()
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        for record in &updated {
            self.hub.publish(&ChangeEvent {
                table: table.to_string(),
                kind: ChangeKind::Update,
                record: record.clone(),
            });
        }
        Ok(updated.len())
    }

    async fn subscribe(&self, topic: SubscriptionTopic) -> Result<Subscription, BackendError> {
        if self.begin(Operation::Subscribe, &topic.table).is_some() {
            return Err(injected(&topic.table));
        }
        Ok(self.hub.subscribe(topic))
    }
}
