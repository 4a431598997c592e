use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use super::{decode_all, fetch, require_text};
use crate::admission::AdmissionCheck;
use crate::error::{Error, Result};
use crate::models::*;
use crate::policy::{AccessPolicy, GroupSet};
use crate::store::{collections, encode, DocumentStore, QueryOp};
use crate::transition::{ShareOutcome, TransitionEngine};

#[derive(Clone)]
pub struct NoteService {
    store: Arc<dyn DocumentStore>,
    engine: TransitionEngine,
    admission: AdmissionCheck,
}

impl NoteService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let engine = TransitionEngine::new(store.clone());
        let admission = AdmissionCheck::new(engine.oracle().clone());
        Self {
            store,
            engine,
            admission,
        }
    }

    pub async fn create_note(&self, owner_id: &str, input: CreateNoteInput) -> Result<Note> {
        require_text("title", &input.title)?;
        require_text("subject_id", &input.subject_id)?;

        let access_policy = self
            .engine
            .initial_policy(
                owner_id,
                input.access_policy,
                input.allowed_groups.map(GroupSet::from),
            )
            .await?;

        let mut note = Note {
            id: String::new(),
            owner_id: owner_id.to_string(),
            subject_id: input.subject_id,
            title: input.title,
            content: input.content,
            tags: input.tags,
            themes: input.themes,
            date: Utc::now(),
            access_policy,
            note_ratings: Vec::new(),
            note_comments: Vec::new(),
            view_counter: 0,
        };

        note.id = self.store.create(collections::NOTES, encode(&note)?).await?;
        tracing::info!("User {} created note {}", owner_id, note.id);
        Ok(note)
    }

    /// Fetches a note by id without any access check.
    pub async fn get_note(&self, id: &str) -> Result<Note> {
        fetch(self.store.as_ref(), collections::NOTES, "note", id).await
    }

    pub async fn can_view(&self, note: &Note, viewer: Option<&str>) -> Result<bool> {
        Ok(self.admission.admit(note, viewer).await?)
    }

    /// Fetches a note for display.
    ///
    /// Fails with [`Error::AccessDenied`] if the viewer is not admitted.
    /// Signed-in viewers bump the view counter; the returned note reflects it.
    pub async fn view_note(&self, id: &str, viewer: Option<&str>) -> Result<Note> {
        let mut note = self.get_note(id).await?;
        if !self.can_view(&note, viewer).await? {
            return Err(Error::AccessDenied {
                note_id: id.to_string(),
            });
        }

        if viewer.is_some() {
            self.store
                .increment(collections::NOTES, id, "view_counter", 1)
                .await?;
            note.view_counter += 1;
        }
        Ok(note)
    }

    pub async fn notes_by_subject(&self, subject_id: &str) -> Result<Vec<Note>> {
        let docs = self
            .store
            .query(
                collections::NOTES,
                "subject_id",
                QueryOp::Eq,
                &json!(subject_id),
            )
            .await?;
        decode_all(docs)
    }

    /// Public notes under a subject that pass `filter`.
    pub async fn public_notes_by_subject(
        &self,
        subject_id: &str,
        filter: &NoteFilter,
    ) -> Result<Vec<Note>> {
        Ok(self
            .notes_by_subject(subject_id)
            .await?
            .into_iter()
            .filter(|n| matches!(n.access_policy, AccessPolicy::Public { .. }))
            .filter(|n| filter.matches(n))
            .collect())
    }

    pub async fn notes_by_owner(&self, owner_id: &str) -> Result<Vec<Note>> {
        let docs = self
            .store
            .query(collections::NOTES, "user_id", QueryOp::Eq, &json!(owner_id))
            .await?;
        decode_all(docs)
    }

    /// An owner's notes, restricted to those `viewer` is admitted to.
    pub async fn visible_notes_by_owner(
        &self,
        owner_id: &str,
        viewer: Option<&str>,
    ) -> Result<Vec<Note>> {
        let mut visible = Vec::new();
        for note in self.notes_by_owner(owner_id).await? {
            if self.can_view(&note, viewer).await? {
                visible.push(note);
            }
        }
        Ok(visible)
    }

    /// Applies an owner's edit.
    ///
    /// A requested access level goes through
    /// [`crate::transition::apply_edited_policy`], so a note already shared
    /// into groups cannot be made fully private here.
    pub async fn update_note(
        &self,
        id: &str,
        acting_user_id: &str,
        input: UpdateNoteInput,
    ) -> Result<Note> {
        let mut note = self.get_note(id).await?;
        self.require_owner(&note, acting_user_id)?;

        let mut fields = Map::new();

        if let Some(subject_id) = input.subject_id {
            require_text("subject_id", &subject_id)?;
            fields.insert("subject_id".into(), json!(subject_id));
            note.subject_id = subject_id;
        }
        if let Some(title) = input.title {
            require_text("title", &title)?;
            fields.insert("title".into(), json!(title));
            note.title = title;
        }
        if let Some(content) = input.content {
            fields.insert("content".into(), json!(content));
            note.content = content;
        }
        if let Some(tags) = input.tags {
            fields.insert("tag".into(), json!(tags));
            note.tags = tags;
        }
        if let Some(themes) = input.themes {
            fields.insert("theme".into(), json!(themes));
            note.themes = themes;
        }
        if let Some(requested) = input.access_policy {
            let policy = self
                .engine
                .edited_policy(
                    &note,
                    acting_user_id,
                    requested,
                    input.allowed_groups.map(GroupSet::from),
                )
                .await?;
            fields.insert("access_policy".into(), json!(policy.to_wire()));
            note.access_policy = policy;
        }

        if !fields.is_empty() {
            self.store
                .update(collections::NOTES, id, Value::Object(fields))
                .await?;
            tracing::info!("User {} updated note {}", acting_user_id, id);
        }
        Ok(note)
    }

    /// Deletes a note and removes it from every user's favorites.
    pub async fn delete_note(&self, id: &str, acting_user_id: &str) -> Result<()> {
        let note = self.get_note(id).await?;
        self.require_owner(&note, acting_user_id)?;

        self.store.delete(collections::NOTES, id).await?;

        for doc in self.store.list(collections::USERS).await? {
            let user: UserProfile = doc.decode()?;
            if !user.favorites.iter().any(|f| f.note_id == id) {
                continue;
            }
            let remaining: Vec<Favorite> = user
                .favorites
                .into_iter()
                .filter(|f| f.note_id != id)
                .collect();
            self.store
                .update(
                    collections::USERS,
                    &user.id,
                    json!({ "favorites": remaining }),
                )
                .await?;
        }

        tracing::info!("User {} deleted note {}", acting_user_id, id);
        Ok(())
    }

    /// Adds a 1-5 rating. Each user may rate a note once.
    pub async fn rate_note(&self, id: &str, rater_id: &str, rating: u8) -> Result<Note> {
        if !(1..=5).contains(&rating) {
            return Err(Error::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let mut note = self.view_without_counting(id, rater_id).await?;
        if note.has_user_rated(rater_id) {
            return Err(Error::InvalidInput(format!(
                "user {} has already rated note {}",
                rater_id, id
            )));
        }

        let entry = NoteRating {
            rating,
            rated_by_uid: rater_id.to_string(),
            date: Utc::now(),
        };
        self.store
            .append_to_array(collections::NOTES, id, "note_ratings", encode(&entry)?)
            .await?;
        note.note_ratings.push(entry);
        Ok(note)
    }

    pub async fn comment_on_note(&self, id: &str, author_id: &str, comment: &str) -> Result<Note> {
        require_text("comment", comment)?;

        let mut note = self.view_without_counting(id, author_id).await?;
        let entry = NoteComment {
            comment: comment.trim().to_string(),
            comment_by_uid: author_id.to_string(),
            date: Utc::now(),
        };
        self.store
            .append_to_array(collections::NOTES, id, "note_comments", encode(&entry)?)
            .await?;
        note.note_comments.push(entry);
        Ok(note)
    }

    /// Public notes with the highest view counts, most viewed first.
    pub async fn most_viewed_public(&self, limit: usize) -> Result<Vec<Note>> {
        let docs = self
            .store
            .query(
                collections::NOTES,
                "access_policy.type",
                QueryOp::Eq,
                &json!("public"),
            )
            .await?;
        let mut notes: Vec<Note> = decode_all(docs)?;
        notes.sort_by(|a, b| b.view_counter.cmp(&a.view_counter));
        notes.truncate(limit);
        Ok(notes)
    }

    /// Shares a note into a group. See [`TransitionEngine::share_note_into_group`].
    pub async fn share_note(
        &self,
        id: &str,
        group_id: &str,
        acting_user_id: &str,
    ) -> Result<ShareOutcome> {
        let note = self.view_without_counting(id, acting_user_id).await?;
        self.engine
            .share_note_into_group(&note, group_id, acting_user_id)
            .await
    }

    async fn view_without_counting(&self, id: &str, viewer: &str) -> Result<Note> {
        let note = self.get_note(id).await?;
        if !self.can_view(&note, Some(viewer)).await? {
            return Err(Error::AccessDenied {
                note_id: id.to_string(),
            });
        }
        Ok(note)
    }

    fn require_owner(&self, note: &Note, acting_user_id: &str) -> Result<()> {
        if note.owner_id != acting_user_id {
            tracing::warn!("User {} is not the owner of note {}", acting_user_id, note.id);
            return Err(Error::NotNoteOwner {
                note_id: note.id.clone(),
                user_id: acting_user_id.to_string(),
            });
        }
        Ok(())
    }
}
