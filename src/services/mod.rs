//! CRUD services over the document store.
//!
//! Each service is cheap to clone and holds the injected store. Policy
//! decisions are delegated to [`crate::transition`] and
//! [`crate::admission`]; the services only load, validate and persist.

mod categories;
mod groups;
mod notes;
mod subjects;
mod users;

pub use categories::CategoryService;
pub use groups::GroupService;
pub use notes::NoteService;
pub use subjects::SubjectService;
pub use users::UserService;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore};

/// All services wired to one store.
#[derive(Clone)]
pub struct Services {
    pub notes: NoteService,
    pub groups: GroupService,
    pub subjects: SubjectService,
    pub categories: CategoryService,
    pub users: UserService,
}

impl Services {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            notes: NoteService::new(store.clone()),
            groups: GroupService::new(store.clone()),
            subjects: SubjectService::new(store.clone()),
            categories: CategoryService::new(store.clone()),
            users: UserService::new(store),
        }
    }
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>> {
    docs.iter()
        .map(|d| d.decode().map_err(Error::from))
        .collect()
}

/// Fetches and decodes a document that the caller expects to exist.
async fn fetch<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    kind: &'static str,
    id: &str,
) -> Result<T> {
    let doc = store
        .get(collection, id)
        .await?
        .ok_or_else(|| Error::not_found(kind, id))?;
    Ok(doc.decode()?)
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
