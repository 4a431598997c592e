use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use super::{decode_all, fetch, require_text};
use crate::error::{Error, Result};
use crate::membership::MembershipOracle;
use crate::models::*;
use crate::store::{collections, encode, DocumentStore, QueryOp};

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn DocumentStore>,
    oracle: MembershipOracle,
}

impl GroupService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let oracle = MembershipOracle::new(store.clone());
        Self { store, oracle }
    }

    pub fn oracle(&self) -> &MembershipOracle {
        &self.oracle
    }

    /// Creates a group with the creator as first member.
    ///
    /// Duplicate member ids are dropped. Fails with
    /// [`Error::DuplicateGroup`] if a group with the same member set exists.
    pub async fn create_group(&self, creator_id: &str, input: CreateGroupInput) -> Result<Group> {
        require_text("name", &input.name)?;

        let mut seen = HashSet::new();
        let members: Vec<String> = std::iter::once(creator_id.to_string())
            .chain(input.members)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .filter(|m| seen.insert(m.clone()))
            .collect();

        if self.oracle.exists_group_with_exact_members(&members).await? {
            tracing::warn!("User {} tried to create a duplicate group", creator_id);
            return Err(Error::DuplicateGroup);
        }

        let mut group = Group {
            id: String::new(),
            name: input.name.trim().to_string(),
            members,
            created_at: Utc::now(),
            shared_notes: Vec::new(),
        };
        group.id = self.store.create(collections::GROUPS, encode(&group)?).await?;

        tracing::info!(
            "User {} created group {} with {} members",
            creator_id,
            group.id,
            group.members.len()
        );
        Ok(group)
    }

    pub async fn get_group(&self, id: &str) -> Result<Group> {
        fetch(self.store.as_ref(), collections::GROUPS, "group", id).await
    }

    /// A group's details, visible to its members only.
    pub async fn get_group_for(&self, id: &str, viewer_id: &str) -> Result<Group> {
        let group = self.get_group(id).await?;
        if !group.is_member(viewer_id) {
            return Err(Error::NotGroupMember {
                group_id: id.to_string(),
                user_id: viewer_id.to_string(),
            });
        }
        Ok(group)
    }

    /// Groups the user belongs to, in creation order.
    pub async fn user_groups(&self, user_id: &str) -> Result<Vec<Group>> {
        let docs = self
            .store
            .query(
                collections::GROUPS,
                "members",
                QueryOp::ArrayContains,
                &json!(user_id),
            )
            .await?;
        decode_all(docs)
    }

    /// Groups the user belongs to, ordered by [`Group::last_activity`].
    pub async fn sorted_user_groups(
        &self,
        user_id: &str,
        sort: GroupSortOption,
    ) -> Result<Vec<Group>> {
        let mut groups = self.user_groups(user_id).await?;
        match sort {
            GroupSortOption::MostRecentDesc => {
                groups.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()))
            }
            GroupSortOption::MostRecentAsc => {
                groups.sort_by(|a, b| a.last_activity().cmp(&b.last_activity()))
            }
        }
        Ok(groups)
    }

    /// When and by whom `note_id` was last shared into the group.
    pub async fn latest_share(&self, group_id: &str, note_id: &str) -> Result<Option<SharedNote>> {
        let group = self.get_group(group_id).await?;
        Ok(group.latest_share(note_id).cloned())
    }

    /// Notes shared into a group, in order of first share.
    ///
    /// Only members may list them. Notes shared more than once appear once;
    /// notes deleted since they were shared are skipped.
    pub async fn group_notes(&self, group_id: &str, viewer_id: &str) -> Result<Vec<Note>> {
        let group = self.get_group_for(group_id, viewer_id).await?;

        let mut seen = HashSet::new();
        let mut notes = Vec::new();
        for shared in &group.shared_notes {
            if !seen.insert(shared.note_id.as_str()) {
                continue;
            }
            match self.store.get(collections::NOTES, &shared.note_id).await? {
                Some(doc) => notes.push(doc.decode()?),
                None => tracing::debug!(
                    "Skipping deleted note {} shared into group {}",
                    shared.note_id,
                    group_id
                ),
            }
        }
        Ok(notes)
    }
}
