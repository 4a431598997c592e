use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named set of users who share notes privately among themselves.
///
/// Membership is fixed at creation and always includes the creator. The
/// `shared_notes` log only grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Insertion-ordered, duplicate-free user ids.
    pub members: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub shared_notes: Vec<SharedNote>,
}

impl Group {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Whether `note_id` was ever shared into this group.
    pub fn has_note(&self, note_id: &str) -> bool {
        self.shared_notes.iter().any(|s| s.note_id == note_id)
    }

    /// The most recent share of `note_id`, if any.
    pub fn latest_share(&self, note_id: &str) -> Option<&SharedNote> {
        self.shared_notes
            .iter()
            .filter(|s| s.note_id == note_id)
            .max_by_key(|s| s.date)
    }

    /// The latest share date, or the creation date if that is later or
    /// nothing has been shared.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.shared_notes
            .iter()
            .map(|s| s.date)
            .max()
            .map_or(self.created_at, |latest| latest.max(self.created_at))
    }
}

/// Log entry recording that a member shared a note into a group.
///
/// Re-shares produce additional entries; nothing is de-duplicated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharedNote {
    pub note_id: String,
    pub shared_by: String,
    pub date: DateTime<Utc>,
}

/// Input for creating a group. The acting user is always added as a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupInput {
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Ordering for a user's group list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GroupSortOption {
    /// Most recently active first.
    #[default]
    MostRecentDesc,
    MostRecentAsc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn share(note_id: &str, date: DateTime<Utc>) -> SharedNote {
        SharedNote {
            note_id: note_id.into(),
            shared_by: "u1".into(),
            date,
        }
    }

    #[test]
    fn latest_share_takes_max_date() {
        let t0 = Utc::now();
        let group = Group {
            id: "g1".into(),
            name: "Study".into(),
            members: vec!["u1".into()],
            created_at: t0,
            shared_notes: vec![
                share("n1", t0 + Duration::minutes(5)),
                share("n2", t0 + Duration::minutes(7)),
                share("n1", t0 + Duration::minutes(1)),
            ],
        };

        assert_eq!(group.latest_share("n1").unwrap().date, t0 + Duration::minutes(5));
        assert!(group.has_note("n2"));
        assert!(group.latest_share("n3").is_none());
        assert_eq!(group.last_activity(), t0 + Duration::minutes(7));
    }

    #[test]
    fn sort_option_uses_camel_case_names() {
        assert_eq!(
            serde_json::to_value(GroupSortOption::MostRecentDesc).unwrap(),
            "mostRecentDesc"
        );
        let asc: GroupSortOption = serde_json::from_str("\"mostRecentAsc\"").unwrap();
        assert_eq!(asc, GroupSortOption::MostRecentAsc);
    }

    #[test]
    fn last_activity_of_quiet_group_is_creation() {
        let t0 = Utc::now();
        let group = Group {
            id: "g1".into(),
            name: "Study".into(),
            members: vec![],
            created_at: t0,
            shared_notes: vec![],
        };
        assert_eq!(group.last_activity(), t0);
    }
}
