//! Capability contract for the hosted backend plus the adapters shipped with
//! the workspace.
//!
//! The messaging flow only ever talks to [`Backend`]; which adapter sits
//! behind it is decided by whoever builds the page.

pub mod hub;
pub mod memory;
pub mod rest;
pub mod subscription;

use async_trait::async_trait;
use thiserror::Error;

use landingos_types::Record;
use landingos_types::events::SubscriptionTopic;
use landingos_types::query::{Filter, Query, Selector};

pub use hub::RealtimeHub;
pub use memory::MemoryBackend;
pub use rest::{RestBackend, RestConfig};
pub use subscription::Subscription;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered but refused the request.
    #[error("request on {table} failed: {message}")]
    Request { table: String, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from {table}: {message}")]
    Decode { table: String, message: String },

    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

/// Record and realtime operations the messaging flow relies on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Rows matching `query`, in the order it asks for.
    async fn select(&self, query: &Query) -> Result<Vec<Record>, BackendError>;

    /// Creates one row and returns it with the `returning` projection
    /// applied (every column when empty).
    async fn insert(
        &self,
        table: &str,
        fields: Record,
        returning: &[Selector],
    ) -> Result<Record, BackendError>;

    /// Merges `fields` into every row matching `filter`. Returns how many
    /// rows changed.
    async fn update(&self, table: &str, fields: Record, filter: &Filter)
    -> Result<usize, BackendError>;

    /// Opens a push channel for `topic`. Dropping the handle unsubscribes.
    async fn subscribe(&self, topic: SubscriptionTopic) -> Result<Subscription, BackendError>;
}
