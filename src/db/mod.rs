mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::store::{
    add_to_number, append_unique, matches, merge, new_id, Document, DocumentStore, QueryOp,
    StoreError,
};

/// [`DocumentStore`] persisted in a single SQLite table of JSON documents.
///
/// One connection is shared behind a mutex, so every store call is atomic.
/// Field-level operations (`update`, `append_to_array`, `increment`) run as
/// read-modify-write inside a transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        tracing::debug!("Opened document store at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        schema::run_migrations(&conn)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("database lock poisoned".into()))
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, data FROM documents WHERE collection = ? ORDER BY rowid")?;

        let rows = stmt
            .query_map([collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, data)| -> Result<Document, StoreError> {
                Ok(Document {
                    id,
                    data: serde_json::from_str(&data)?,
                })
            })
            .collect()
    }

    /// Loads one document body, applies `f`, and writes it back in one transaction.
    fn modify<F>(&self, collection: &str, id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), StoreError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };

        let mut data: Value = serde_json::from_str(&raw)?;
        f(&mut data)?;

        tx.execute(
            "UPDATE documents SET data = ?, updated_at = ? WHERE collection = ? AND id = ?",
            (
                serde_json::to_string(&data)?,
                Utc::now().to_rfc3339(),
                collection,
                id,
            ),
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|data| -> Result<Document, StoreError> {
            Ok(Document {
                id: id.to_string(),
                data: serde_json::from_str(&data)?,
            })
        })
        .transpose()
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.read_all(collection)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .read_all(collection)?
            .into_iter()
            .filter(|d| matches(&d.data, field, op, value))
            .collect())
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = new_id();
        self.put(collection, &id, data).await?;
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO documents (collection, id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            (collection, id, serde_json::to_string(&data)?, &now, &now),
        )?;
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
        let conn = self.lock()?;
        let rows = conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            (collection, id),
        )?;
        Ok(rows > 0)
    }
}

/// `<platform data dir>/notedeck/notedeck.db`.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "notedeck")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("notedeck.db"))
}
