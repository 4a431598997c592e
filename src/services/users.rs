use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::{decode_all, fetch, require_text};
use crate::admission::AdmissionCheck;
use crate::error::{Error, Result};
use crate::membership::MembershipOracle;
use crate::models::*;
use crate::store::{collections, encode, DocumentStore};

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
    admission: AdmissionCheck,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let admission = AdmissionCheck::new(MembershipOracle::new(store.clone()));
        Self { store, admission }
    }

    /// Stores the profile for an authenticated user id.
    pub async fn register(&self, user_id: &str, input: RegisterUserInput) -> Result<UserProfile> {
        require_text("user id", user_id)?;
        require_text("username", &input.username)?;

        if self.store.get(collections::USERS, user_id).await?.is_some() {
            return Err(Error::AlreadyExists {
                kind: "user",
                id: user_id.to_string(),
            });
        }

        let user = UserProfile {
            id: user_id.to_string(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            username: input.username.trim().to_string(),
            is_admin: false,
            favorites: Vec::new(),
        };
        self.store
            .put(collections::USERS, user_id, encode(&user)?)
            .await?;

        tracing::info!("Registered user {} as {}", user.id, user.username);
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> Result<UserProfile> {
        fetch(self.store.as_ref(), collections::USERS, "user", id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let docs = self.store.list(collections::USERS).await?;
        decode_all(docs)
    }

    /// Bookmarks a note. Adding a note twice keeps the first entry.
    pub async fn add_favorite(&self, user_id: &str, note_id: &str) -> Result<Favorite> {
        let user = self.get_user(user_id).await?;
        if let Some(existing) = user.favorites.iter().find(|f| f.note_id == note_id) {
            return Ok(existing.clone());
        }

        let note: Note = fetch(self.store.as_ref(), collections::NOTES, "note", note_id).await?;
        if !self.admission.admit(&note, Some(user_id)).await? {
            return Err(Error::AccessDenied {
                note_id: note_id.to_string(),
            });
        }

        let favorite = Favorite {
            note_id: note_id.to_string(),
            added_at: Utc::now(),
        };
        self.store
            .append_to_array(collections::USERS, user_id, "favorites", encode(&favorite)?)
            .await?;

        tracing::debug!("User {} favorited note {}", user_id, note_id);
        Ok(favorite)
    }

    /// Returns whether a favorite was removed.
    pub async fn remove_favorite(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let user = self.get_user(user_id).await?;
        let before = user.favorites.len();
        let remaining: Vec<Favorite> = user
            .favorites
            .into_iter()
            .filter(|f| f.note_id != note_id)
            .collect();
        if remaining.len() == before {
            return Ok(false);
        }

        self.store
            .update(collections::USERS, user_id, json!({ "favorites": remaining }))
            .await?;
        tracing::debug!("User {} unfavorited note {}", user_id, note_id);
        Ok(true)
    }

    /// Favorites, newest first.
    pub async fn favorites(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let mut favorites = self.get_user(user_id).await?.favorites;
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        Ok(favorites)
    }

    pub async fn is_favorite(&self, user_id: &str, note_id: &str) -> Result<bool> {
        Ok(self
            .get_user(user_id)
            .await?
            .favorites
            .iter()
            .any(|f| f.note_id == note_id))
    }

    /// The favorited notes the user can still see, newest favorite first.
    pub async fn favorite_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        for favorite in self.favorites(user_id).await? {
            let Some(doc) = self.store.get(collections::NOTES, &favorite.note_id).await? else {
                continue;
            };
            let note: Note = doc.decode()?;
            if self.admission.admit(&note, Some(user_id)).await? {
                notes.push(note);
            }
        }
        Ok(notes)
    }
}
