use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, warn};

use landingos_types::Record;
use landingos_types::events::SubscriptionTopic;
use landingos_types::query::{Filter, Order, Query, Selector};

use crate::{Backend, BackendError, Subscription};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.example.co`. `/rest/v1` is appended.
    pub base_url: String,
    pub api_key: String,
    /// User session token. Falls back to the API key when absent.
    pub access_token: Option<String>,
}

/// Record operations over the PostgREST-style query dialect hosted backends
/// expose. Realtime is not spoken here; see [`Backend::subscribe`].
pub struct RestBackend {
    client: Client,
    config: RestConfig,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key);
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(token)
    }

    async fn rows(table: &str, response: Response) -> Result<Vec<Record>, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} request failed with {}: {}", table, status, body);
            return Err(BackendError::Request {
                table: table.to_string(),
                message: format!("{}: {}", status, body),
            });
        }

        response
            .json::<Vec<Record>>()
            .await
            .map_err(|e| BackendError::Decode {
                table: table.to_string(),
                message: e.to_string(),
            })
    }
}

/// A value as it appears after an operator, e.g. the `5` in `id=eq.5`.
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// List members containing reserved characters are double-quoted.
fn list_member(value: &Value) -> String {
    let raw = literal(value);
    if raw.contains([',', '(', ')', '"', ' ']) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}

pub fn select_param(selectors: &[Selector]) -> String {
    if selectors.is_empty() {
        return "*".into();
    }

    selectors
        .iter()
        .map(|selector| match selector {
            Selector::Column(name) => name.clone(),
            Selector::Expand {
                alias,
                table,
                foreign_key,
                columns,
            } => format!("{}:{}!{}({})", alias, table, foreign_key, columns.join(",")),
        })
        .collect::<Vec<_>>()
        .join(",")
}

pub fn filter_param(filter: &Filter) -> (String, String) {
    let value = match filter {
        Filter::Eq(_, value) => format!("eq.{}", literal(value)),
        Filter::NotNull(_) => "not.is.null".into(),
        Filter::IsNull(_) => "is.null".into(),
        Filter::In(_, values) => format!(
            "in.({})",
            values.iter().map(list_member).collect::<Vec<_>>().join(",")
        ),
    };
    (filter.column().to_string(), value)
}

fn order_param(order: &[Order]) -> String {
    order
        .iter()
        .map(|o| format!("{}.{}", o.column, if o.ascending { "asc" } else { "desc" }))
        .collect::<Vec<_>>()
        .join(",")
}

/// Query-string pairs for a record query.
pub fn query_pairs(query: &Query) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), select_param(&query.select))];
    pairs.extend(query.filters.iter().map(filter_param));
    if !query.order.is_empty() {
        pairs.push(("order".into(), order_param(&query.order)));
    }
    if let Some(limit) = query.limit {
        pairs.push(("limit".into(), limit.to_string()));
    }
    pairs
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, query: &Query) -> Result<Vec<Record>, BackendError> {
        let pairs = query_pairs(query);
        debug!("GET {} {:?}", query.table, pairs);

        let response = self
            .authorize(self.client.get(self.url(&query.table)))
            .query(&pairs)
            .send()
            .await?;
        Self::rows(&query.table, response).await
    }

    async fn insert(
        &self,
        table: &str,
        fields: Record,
        returning: &[Selector],
    ) -> Result<Record, BackendError> {
        debug!("POST {}", table);

        let response = self
            .authorize(self.client.post(self.url(table)))
            .query(&[("select", select_param(returning))])
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;

        Self::rows(table, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode {
                table: table.to_string(),
                message: "insert returned no row".into(),
            })
    }

    async fn update(
        &self,
        table: &str,
        fields: Record,
        filter: &Filter,
    ) -> Result<usize, BackendError> {
        debug!("PATCH {}", table);

        let response = self
            .authorize(self.client.patch(self.url(table)))
            .query(&[filter_param(filter), ("select".into(), "id".into())])
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;

        Ok(Self::rows(table, response).await?.len())
    }

    async fn subscribe(&self, topic: SubscriptionTopic) -> Result<Subscription, BackendError> {
        debug!("Realtime requested for {} but not available over REST", topic.table);
        Err(BackendError::Unsupported("realtime subscriptions"))
    }
}
