use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{
    add_to_number, append_unique, matches, merge, new_id, Document, DocumentStore, QueryOp,
    StoreError,
};

type Collections = HashMap<String, Vec<Document>>;

/// Volatile [`DocumentStore`] backed by a mutex-guarded map.
///
/// Clones share the same data. Used by tests and by `notedeck serve --memory`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    /// Runs `f` against a copy of an existing document's body.
    ///
    /// The copy replaces the stored body only when `f` succeeds.
    fn modify<F>(&self, collection: &str, id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), StoreError>,
    {
        let mut collections = self.lock()?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let mut data = doc.data.clone();
        f(&mut data)?;
        doc.data = data;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock()?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(&d.data, field, op, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = new_id();
        self.put(collection, &id, data).await?;
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.data = data,
            None => docs.push(Document {
                id: id.to_string(),
                data,
            }),
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> Result<(), StoreError> {
        self.modify(collection, id, |data| merge(data, partial))
    }

    async fn append_to_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        self.modify(collection, id, |data| append_unique(data, field, value))
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        self.modify(collection, id, |data| add_to_number(data, field, by))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() < before)
    }
}
