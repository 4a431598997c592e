use std::sync::Arc;

use serde_json::json;

use super::{decode_all, fetch, require_text};
use crate::error::Result;
use crate::models::*;
use crate::store::{collections, encode, DocumentStore};

#[derive(Clone)]
pub struct CategoryService {
    store: Arc<dyn DocumentStore>,
}

impl CategoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        require_text("tag", &input.tag)?;

        let mut category = Category {
            id: String::new(),
            tag: input.tag.trim().to_string(),
        };
        category.id = self
            .store
            .create(collections::CATEGORIES, encode(&category)?)
            .await?;

        tracing::info!("Created category {} ({})", category.tag, category.id);
        Ok(category)
    }

    pub async fn get_category(&self, id: &str) -> Result<Category> {
        fetch(self.store.as_ref(), collections::CATEGORIES, "category", id).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let docs = self.store.list(collections::CATEGORIES).await?;
        decode_all(docs)
    }

    /// Renames a category. Notes keep the tag they were saved with.
    pub async fn update_category(&self, id: &str, input: UpdateCategoryInput) -> Result<Category> {
        let mut category = self.get_category(id).await?;

        if let Some(tag) = input.tag {
            require_text("tag", &tag)?;
            category.tag = tag.trim().to_string();
            self.store
                .update(collections::CATEGORIES, id, json!({ "tag": category.tag }))
                .await?;
            tracing::info!("Renamed category {} to {}", id, category.tag);
        }
        Ok(category)
    }
}
