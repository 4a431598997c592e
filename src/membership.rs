//! Group membership queries backed by the document store.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::models::Group;
use crate::store::{collections, DocumentStore, QueryOp, StoreError};

/// Answers "is this user in that group" against the document store.
///
/// A group that does not exist grants nothing: lookups resolve to `false`
/// rather than an error. Store failures are propagated.
#[derive(Clone)]
pub struct MembershipOracle {
    store: Arc<dyn DocumentStore>,
}

impl MembershipOracle {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn is_member(&self, group_id: &str, user_id: &str) -> Result<bool, StoreError> {
        let Some(doc) = self.store.get(collections::GROUPS, group_id).await? else {
            tracing::debug!("Group {} does not exist, denying {}", group_id, user_id);
            return Ok(false);
        };

        let group: Group = doc.decode()?;
        Ok(group.is_member(user_id))
    }

    /// True if the user belongs to at least one of `group_ids`.
    ///
    /// Groups are checked in order and the scan stops at the first hit.
    pub async fn is_member_of_any<I, S>(&self, group_ids: I, user_id: &str) -> Result<bool, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for group_id in group_ids {
            if self.is_member(group_id.as_ref(), user_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True if some stored group has exactly this member set, ignoring order
    /// and duplicates.
    pub async fn exists_group_with_exact_members(
        &self,
        member_ids: &[String],
    ) -> Result<bool, StoreError> {
        let wanted: HashSet<&str> = member_ids.iter().map(String::as_str).collect();
        let Some(anchor) = wanted.iter().min() else {
            return Ok(false);
        };

        let candidates = self
            .store
            .query(
                collections::GROUPS,
                "members",
                QueryOp::ArrayContains,
                &Value::String(anchor.to_string()),
            )
            .await?;

        for doc in candidates {
            let group: Group = doc.decode()?;
            let members: HashSet<&str> = group.members.iter().map(String::as_str).collect();
            if members == wanted {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
