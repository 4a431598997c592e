//! Access policy transitions.
//!
//! The two pure functions encode the policy state machine:
//!
//! | State | Action | Result |
//! |---|---|---|
//! | Private | owner shares into G | Group{G} |
//! | Group{S} | owner shares into G | Group{S ∪ {G}} |
//! | Public{S} | owner shares into G | Public{S ∪ {G}} |
//! | Group{S} | edit to private | Group{S} |
//! | Public{S ≠ ∅} | edit to private | Group{S} |
//! | Public{∅} / Private | edit to private | Private |
//!
//! [`TransitionEngine`] wraps them with the membership checks and store
//! writes. The read-modify-write of a note's policy is not guarded against
//! concurrent writers; two owners' shares racing on one note can lose one
//! group addition.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::membership::MembershipOracle;
use crate::models::{Note, SharedNote};
use crate::policy::{AccessPolicy, AccessPolicyType, GroupSet, PolicyError};
use crate::store::{collections, encode, DocumentStore};

/// Records `group_id` on the policy, escalating `Private` to `Group`.
///
/// `Public` stays public; the group is only bookkept. Idempotent.
pub fn escalate_to_group(policy: &AccessPolicy, group_id: &str) -> AccessPolicy {
    match policy {
        AccessPolicy::Private => AccessPolicy::Group {
            allowed_groups: GroupSet::from_iter([group_id]),
        },
        AccessPolicy::Group { allowed_groups } => {
            let mut allowed_groups = allowed_groups.clone();
            allowed_groups.insert(group_id);
            AccessPolicy::Group { allowed_groups }
        }
        AccessPolicy::Public { allowed_groups } => {
            let mut allowed_groups = allowed_groups.clone();
            allowed_groups.insert(group_id);
            AccessPolicy::Public { allowed_groups }
        }
    }
}

/// Resolves an editor's requested access level against the stored policy.
///
/// Asking for `Private` never hides a note from groups it was already
/// shared into: a `Group` note stays as it is, and a `Public` note with
/// recorded groups drops to `Group` over those groups.
pub fn apply_edited_policy(
    existing: &AccessPolicy,
    requested: AccessPolicyType,
    requested_groups: Option<GroupSet>,
) -> std::result::Result<AccessPolicy, PolicyError> {
    if requested != AccessPolicyType::Private {
        let groups = requested_groups
            .or_else(|| existing.allowed_groups().cloned())
            .unwrap_or_default();
        return AccessPolicy::from_request(requested, groups);
    }

    match existing {
        AccessPolicy::Group { .. } => Ok(existing.clone()),
        AccessPolicy::Public { allowed_groups } if !allowed_groups.is_empty() => {
            Ok(AccessPolicy::Group {
                allowed_groups: allowed_groups.clone(),
            })
        }
        AccessPolicy::Public { .. } | AccessPolicy::Private => Ok(AccessPolicy::Private),
    }
}

/// Result of [`TransitionEngine::share_note_into_group`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareOutcome {
    /// The log entry appended to the group.
    pub shared: SharedNote,
    /// The note's new policy, when the owner shared and it changed.
    pub policy: Option<AccessPolicy>,
}

/// Applies policy transitions and persists them.
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn DocumentStore>,
    oracle: MembershipOracle,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let oracle = MembershipOracle::new(store.clone());
        Self { store, oracle }
    }

    pub fn oracle(&self) -> &MembershipOracle {
        &self.oracle
    }

    /// Shares `note` into a group on behalf of `acting_user_id`.
    ///
    /// The actor must be a group member; otherwise nothing is written. The
    /// share is always logged on the group. Only when the actor owns the note
    /// is the note's own policy escalated.
    pub async fn share_note_into_group(
        &self,
        note: &Note,
        group_id: &str,
        acting_user_id: &str,
    ) -> Result<ShareOutcome> {
        if !self.oracle.is_member(group_id, acting_user_id).await? {
            tracing::warn!(
                "User {} tried to share note {} into group {} without membership",
                acting_user_id,
                note.id,
                group_id
            );
            return Err(Error::NotGroupMember {
                group_id: group_id.to_string(),
                user_id: acting_user_id.to_string(),
            });
        }

        let shared = SharedNote {
            note_id: note.id.clone(),
            shared_by: acting_user_id.to_string(),
            date: Utc::now(),
        };
        self.store
            .append_to_array(
                collections::GROUPS,
                group_id,
                "shared_notes",
                encode(&shared)?,
            )
            .await?;
        tracing::info!(
            "User {} shared note {} into group {}",
            acting_user_id,
            note.id,
            group_id
        );

        if acting_user_id != note.owner_id {
            return Ok(ShareOutcome {
                shared,
                policy: None,
            });
        }

        let current = self.load_policy(&note.id).await?;
        let escalated = escalate_to_group(&current, group_id);
        if escalated == current {
            return Ok(ShareOutcome {
                shared,
                policy: None,
            });
        }

        self.store_policy(&note.id, &escalated).await?;
        tracing::info!(
            "Note {} access policy is now {}",
            note.id,
            escalated.kind().as_str()
        );

        Ok(ShareOutcome {
            shared,
            policy: Some(escalated),
        })
    }

    /// Policy for a note being created by `owner_id`.
    ///
    /// The owner must belong to every requested group.
    pub async fn initial_policy(
        &self,
        owner_id: &str,
        requested: AccessPolicyType,
        requested_groups: Option<GroupSet>,
    ) -> Result<AccessPolicy> {
        let policy = AccessPolicy::from_request(requested, requested_groups.unwrap_or_default())?;
        self.require_membership(owner_id, &policy, None).await?;
        Ok(policy)
    }

    /// Computes the edited policy for `note` without persisting it.
    ///
    /// Only the owner may edit. Groups the edit adds beyond those already
    /// recorded require the owner's membership.
    pub async fn edited_policy(
        &self,
        note: &Note,
        acting_user_id: &str,
        requested: AccessPolicyType,
        requested_groups: Option<GroupSet>,
    ) -> Result<AccessPolicy> {
        if acting_user_id != note.owner_id {
            return Err(Error::NotNoteOwner {
                note_id: note.id.clone(),
                user_id: acting_user_id.to_string(),
            });
        }

        let policy = apply_edited_policy(&note.access_policy, requested, requested_groups)?;
        self.require_membership(acting_user_id, &policy, note.access_policy.allowed_groups())
            .await?;
        Ok(policy)
    }

    /// Edits and persists a note's policy.
    pub async fn edit_policy(
        &self,
        note: &Note,
        acting_user_id: &str,
        requested: AccessPolicyType,
        requested_groups: Option<GroupSet>,
    ) -> Result<AccessPolicy> {
        let policy = self
            .edited_policy(note, acting_user_id, requested, requested_groups)
            .await?;
        if policy != note.access_policy {
            self.store_policy(&note.id, &policy).await?;
        }
        Ok(policy)
    }

    async fn require_membership(
        &self,
        user_id: &str,
        policy: &AccessPolicy,
        already_recorded: Option<&GroupSet>,
    ) -> Result<()> {
        let Some(groups) = policy.allowed_groups() else {
            return Ok(());
        };

        for group_id in groups.iter() {
            if already_recorded.is_some_and(|known| known.contains(group_id)) {
                continue;
            }
            if !self.oracle.is_member(group_id, user_id).await? {
                return Err(Error::NotGroupMember {
                    group_id: group_id.to_string(),
                    user_id: user_id.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn load_policy(&self, note_id: &str) -> Result<AccessPolicy> {
        let doc = self
            .store
            .get(collections::NOTES, note_id)
            .await?
            .ok_or_else(|| Error::not_found("note", note_id))?;
        let note: Note = doc.decode()?;
        Ok(note.access_policy)
    }

    async fn store_policy(&self, note_id: &str, policy: &AccessPolicy) -> Result<()> {
        self.store
            .update(
                collections::NOTES,
                note_id,
                json!({ "access_policy": policy.to_wire() }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(ids: &[&str]) -> GroupSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn private_escalates_to_single_group() {
        assert_eq!(
            escalate_to_group(&AccessPolicy::Private, "g1"),
            AccessPolicy::Group {
                allowed_groups: groups(&["g1"])
            }
        );
    }

    #[test]
    fn group_gains_new_group() {
        let policy = AccessPolicy::Group {
            allowed_groups: groups(&["g1"]),
        };
        assert_eq!(
            escalate_to_group(&policy, "g2"),
            AccessPolicy::Group {
                allowed_groups: groups(&["g1", "g2"])
            }
        );
    }

    #[test]
    fn public_only_records_the_group() {
        let escalated = escalate_to_group(&AccessPolicy::public(), "g1");
        assert_eq!(
            escalated,
            AccessPolicy::Public {
                allowed_groups: groups(&["g1"])
            }
        );
    }

    #[test]
    fn non_private_edit_defaults_to_existing_groups() {
        let existing = AccessPolicy::Group {
            allowed_groups: groups(&["g1"]),
        };
        assert_eq!(
            apply_edited_policy(&existing, AccessPolicyType::Public, None),
            Ok(AccessPolicy::Public {
                allowed_groups: groups(&["g1"])
            })
        );
    }

    #[test]
    fn private_to_group_edit_without_groups_is_invalid() {
        assert!(apply_edited_policy(&AccessPolicy::Private, AccessPolicyType::Group, None).is_err());
    }

    #[test]
    fn private_edit_of_private_stays_private() {
        assert_eq!(
            apply_edited_policy(&AccessPolicy::Private, AccessPolicyType::Private, None),
            Ok(AccessPolicy::Private)
        );
    }
}
