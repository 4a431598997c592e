use std::sync::Arc;

use serde_json::json;

use super::{decode_all, fetch, require_text};
use crate::error::{Error, Result};
use crate::models::*;
use crate::store::{collections, encode, DocumentStore, QueryOp};

#[derive(Clone)]
pub struct SubjectService {
    store: Arc<dyn DocumentStore>,
}

impl SubjectService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Course codes are stored lowercased and must be unique.
    pub async fn create_subject(&self, input: CreateSubjectInput) -> Result<Subject> {
        require_text("subject_code", &input.subject_code)?;
        require_text("name", &input.name)?;

        let subject_code = input.subject_code.trim().to_lowercase();
        let existing = self
            .store
            .query(
                collections::SUBJECTS,
                "subject_code",
                QueryOp::Eq,
                &json!(subject_code),
            )
            .await?;
        if !existing.is_empty() {
            return Err(Error::AlreadyExists {
                kind: "subject",
                id: subject_code,
            });
        }

        let mut subject = Subject {
            id: String::new(),
            subject_code,
            name: input.name.trim().to_string(),
            description: input.description,
        };
        subject.id = self
            .store
            .create(collections::SUBJECTS, encode(&subject)?)
            .await?;

        tracing::info!("Created subject {} ({})", subject.subject_code, subject.id);
        Ok(subject)
    }

    pub async fn get_subject(&self, id: &str) -> Result<Subject> {
        fetch(self.store.as_ref(), collections::SUBJECTS, "subject", id).await
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let docs = self.store.list(collections::SUBJECTS).await?;
        decode_all(docs)
    }
}
