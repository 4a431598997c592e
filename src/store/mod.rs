//! Document store abstraction.
//!
//! Everything notedeck persists lives in collections of JSON documents keyed
//! by an opaque id. The [`DocumentStore`] trait is the only way the rest of
//! the crate touches storage, so the same services run against the
//! in-memory [`MemoryStore`] in tests and the SQLite-backed
//! [`crate::db::SqliteStore`] in a server.
//!
//! Field paths in queries and updates may be dotted (`access_policy.type`).

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Collection names.
pub mod collections {
    pub const NOTES: &str = "notes";
    pub const CATEGORIES: &str = "categories";
    pub const GROUPS: &str = "groups";
    pub const SUBJECTS: &str = "subjects";
    pub const USERS: &str = "users";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

/// A stored document: its id plus the JSON object body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserializes the body into `T`, exposing the document id as an `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut data = self.data.clone();
        if let Value::Object(map) = &mut data {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Serializes a model into a document body. The `id` field is dropped
/// because the store owns document ids.
pub fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    let mut data = serde_json::to_value(value)?;
    if let Value::Object(map) = &mut data {
        map.remove("id");
    }
    Ok(data)
}

/// Comparison used by [`DocumentStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    /// Field equals the value.
    Eq,
    /// Field is an array containing the value.
    ArrayContains,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one document. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents in a collection, in insertion order.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Documents whose `field` satisfies `op` against `value`, in insertion order.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Inserts a document under a fresh id and returns that id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Inserts or replaces the document stored under `id`.
    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    /// Overwrites the fields named in `partial`. Fails with
    /// [`StoreError::NotFound`] if the document does not exist.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError>;

    /// Appends `value` to the array at `field` unless a structurally equal
    /// element is already there. A missing field becomes a one-element array.
    async fn append_to_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Adds `by` to the numeric field (missing counts as 0).
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError>;

    /// Removes a document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

// ============================================================
// Document helpers shared by the store implementations
// ============================================================

/// Resolves a dotted field path inside a document body.
pub(crate) fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |node, key| node.get(key))
}

pub(crate) fn matches(data: &Value, field: &str, op: QueryOp, value: &Value) -> bool {
    match (op, lookup(data, field)) {
        (QueryOp::Eq, Some(found)) => found == value,
        (QueryOp::ArrayContains, Some(Value::Array(items))) => items.contains(value),
        _ => false,
    }
}

/// Returns a mutable slot for a dotted path, creating intermediate objects.
fn slot<'a>(data: &'a mut Value, path: &str) -> Result<&'a mut Value, StoreError> {
    let mut node = data;
    for key in path.split('.') {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map.entry(key.to_string()).or_insert(Value::Null),
            _ => {
                return Err(StoreError::Backend(format!(
                    "cannot descend into non-object at '{}'",
                    path
                )));
            }
        };
    }
    Ok(node)
}

pub(crate) fn merge(data: &mut Value, partial: Value) -> Result<(), StoreError> {
    let Value::Object(fields) = partial else {
        return Err(StoreError::Backend("update body must be a JSON object".into()));
    };
    for (path, value) in fields {
        *slot(data, &path)? = value;
    }
    Ok(())
}

pub(crate) fn append_unique(data: &mut Value, field: &str, value: Value) -> Result<(), StoreError> {
    let target = slot(data, field)?;
    if target.is_null() {
        *target = Value::Array(Vec::new());
    }
    match target {
        Value::Array(items) => {
            if !items.contains(&value) {
                items.push(value);
            }
            Ok(())
        }
        _ => Err(StoreError::Backend(format!("field '{}' is not an array", field))),
    }
}

pub(crate) fn add_to_number(data: &mut Value, field: &str, by: i64) -> Result<(), StoreError> {
    let target = slot(data, field)?;
    let current = match target {
        Value::Null => 0,
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| StoreError::Backend(format!("field '{}' is not an integer", field)))?,
        _ => {
            return Err(StoreError::Backend(format!("field '{}' is not a number", field)));
        }
    };
    *target = Value::from(current + by);
    Ok(())
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_follows_dotted_paths() {
        let doc = json!({ "access_policy": { "type": "public" } });
        assert_eq!(lookup(&doc, "access_policy.type"), Some(&json!("public")));
        assert_eq!(lookup(&doc, "access_policy.allowed_groups"), None);
    }

    #[test]
    fn array_contains_only_matches_arrays() {
        let doc = json!({ "members": ["u1", "u2"], "name": "u1" });
        assert!(matches(&doc, "members", QueryOp::ArrayContains, &json!("u2")));
        assert!(!matches(&doc, "name", QueryOp::ArrayContains, &json!("u1")));
    }

    #[test]
    fn merge_overwrites_named_fields_only() {
        let mut doc = json!({ "title": "a", "content": "b" });
        merge(&mut doc, json!({ "title": "c", "access_policy.type": "group" })).unwrap();
        assert_eq!(
            doc,
            json!({ "title": "c", "content": "b", "access_policy": { "type": "group" } })
        );
    }

    #[test]
    fn append_unique_skips_equal_elements() {
        let mut doc = json!({});
        append_unique(&mut doc, "favorites", json!({ "noteId": "n1" })).unwrap();
        append_unique(&mut doc, "favorites", json!({ "noteId": "n1" })).unwrap();
        append_unique(&mut doc, "favorites", json!({ "noteId": "n2" })).unwrap();
        assert_eq!(doc["favorites"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn add_to_number_treats_missing_as_zero() {
        let mut doc = json!({});
        add_to_number(&mut doc, "view_counter", 1).unwrap();
        add_to_number(&mut doc, "view_counter", 2).unwrap();
        assert_eq!(doc["view_counter"], json!(3));
    }

    #[test]
    fn decode_exposes_document_id() {
        #[derive(serde::Deserialize)]
        struct Named {
            id: String,
            name: String,
        }

        let doc = Document {
            id: "s1".into(),
            data: json!({ "name": "Statistics" }),
        };
        let named: Named = doc.decode().unwrap();
        assert_eq!(named.id, "s1");
        assert_eq!(named.name, "Statistics");
    }
}
