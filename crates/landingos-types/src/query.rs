use serde_json::Value;

/// Table names used by the messaging flow.
pub mod tables {
    pub const CLIENT_PROFILES: &str = "client_profiles";
    pub const CHAT_CHANNELS: &str = "chat_channels";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const PROFILES: &str = "profiles";
}

/// A column selector. `Expand` pulls one level of a foreign-key relation into
/// the row under `alias`.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Column(String),
    Expand {
        alias: String,
        table: String,
        foreign_key: String,
        columns: Vec<String>,
    },
}

impl Selector {
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    pub fn expand(alias: &str, table: &str, foreign_key: &str, columns: &[&str]) -> Self {
        Self::Expand {
            alias: alias.to_string(),
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Sender display fields attached to every message row.
    pub fn message_sender() -> Self {
        Self::expand(
            "sender",
            tables::PROFILES,
            "sender_id",
            &["id", "full_name", "role", "avatar_url"],
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    NotNull(String),
    IsNull(String),
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::Eq(column.to_string(), value.into())
    }

    pub fn not_null(column: &str) -> Self {
        Self::NotNull(column.to_string())
    }

    pub fn is_null(column: &str) -> Self {
        Self::IsNull(column.to_string())
    }

    pub fn any_of<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(column, _)
            | Self::NotNull(column)
            | Self::IsNull(column)
            | Self::In(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Record query against one table. An empty selector list means every column.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub select: Vec<Selector>,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            select: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.select
            .extend(columns.iter().map(|c| Selector::column(*c)));
        self
    }

    pub fn select(mut self, selector: Selector) -> Self {
        self.select.push(selector);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
