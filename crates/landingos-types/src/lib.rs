pub mod events;
pub mod models;
pub mod query;
pub mod records;

/// A loosely-typed row as the backend hands it over. Typed entities are
/// decoded from this in [`records`] and never travel further as maps.
pub type Record = serde_json::Map<String, serde_json::Value>;
