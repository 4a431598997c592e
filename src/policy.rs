//! Access policy state for notes.
//!
//! A note is either private to its owner, public, or restricted to the
//! members of a set of groups. The stored shape is the loosely typed
//! [`PolicyWire`] (`{"type": "group", "allowed_groups": [...]}`); in memory
//! it is always the closed [`AccessPolicy`] enum so every decision over it
//! is exhaustive.
//!
//! Policies are never mutated in place by callers. New values come out of
//! [`crate::transition`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("unknown access policy type: {0}")]
    UnknownType(String),

    #[error("group access policy requires at least one group")]
    EmptyGroupSet,
}

/// The three visibility classes, without their group bookkeeping.
///
/// This is what an editor's access-level dropdown produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum AccessPolicyType {
    Private,
    Public,
    Group,
}

impl AccessPolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Group => "group",
        }
    }

    /// Case-insensitive parse of a policy type name.
    pub fn parse(s: &str) -> Result<Self, PolicyError> {
        match s.to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            "group" => Ok(Self::Group),
            _ => Err(PolicyError::UnknownType(s.to_string())),
        }
    }
}

impl TryFrom<String> for AccessPolicyType {
    type Error = PolicyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

/// Insertion-ordered set of group ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct GroupSet(Vec<String>);

impl GroupSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds `group_id` if absent. Returns whether the set changed.
    pub fn insert(&mut self, group_id: impl Into<String>) -> bool {
        let group_id = group_id.into();
        if self.contains(&group_id) {
            return false;
        }
        self.0.push(group_id);
        true
    }

    pub fn contains(&self, group_id: &str) -> bool {
        self.0.iter().any(|g| g == group_id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True if every element of `self` is also in `other`.
    pub fn is_subset(&self, other: &GroupSet) -> bool {
        self.iter().all(|g| other.contains(g))
    }
}

impl From<Vec<String>> for GroupSet {
    fn from(ids: Vec<String>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<GroupSet> for Vec<String> {
    fn from(set: GroupSet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for GroupSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = GroupSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Visibility classification of a note.
///
/// - `Private`: only the owner.
/// - `Public`: everyone. `allowed_groups` only records which groups the note
///   was additionally shared into; it never narrows visibility.
/// - `Group`: the owner plus members of any group in `allowed_groups`
///   (never empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyWire", into = "PolicyWire")]
pub enum AccessPolicy {
    Private,
    Public { allowed_groups: GroupSet },
    Group { allowed_groups: GroupSet },
}

impl AccessPolicy {
    pub fn public() -> Self {
        Self::Public {
            allowed_groups: GroupSet::new(),
        }
    }

    /// Builds the policy an author asked for.
    ///
    /// `groups` is ignored for `Private`. A `Group` request with no groups is
    /// rejected.
    pub fn from_request(kind: AccessPolicyType, groups: GroupSet) -> Result<Self, PolicyError> {
        match kind {
            AccessPolicyType::Private => Ok(Self::Private),
            AccessPolicyType::Public => Ok(Self::Public {
                allowed_groups: groups,
            }),
            AccessPolicyType::Group if groups.is_empty() => Err(PolicyError::EmptyGroupSet),
            AccessPolicyType::Group => Ok(Self::Group {
                allowed_groups: groups,
            }),
        }
    }

    pub fn kind(&self) -> AccessPolicyType {
        match self {
            Self::Private => AccessPolicyType::Private,
            Self::Public { .. } => AccessPolicyType::Public,
            Self::Group { .. } => AccessPolicyType::Group,
        }
    }

    /// The recorded group set, `None` for `Private`.
    pub fn allowed_groups(&self) -> Option<&GroupSet> {
        match self {
            Self::Private => None,
            Self::Public { allowed_groups } | Self::Group { allowed_groups } => {
                Some(allowed_groups)
            }
        }
    }

    pub fn to_wire(&self) -> PolicyWire {
        PolicyWire {
            kind: self.kind().as_str().to_string(),
            allowed_groups: self.allowed_groups().map(|g| g.as_slice().to_vec()),
        }
    }

    pub fn from_wire(wire: PolicyWire) -> Result<Self, PolicyError> {
        let kind = AccessPolicyType::parse(&wire.kind)?;
        let groups: GroupSet = wire.allowed_groups.unwrap_or_default().into();
        Self::from_request(kind, groups)
    }
}

/// Stored form of an [`AccessPolicy`].
///
/// `allowed_groups` is present only for `public` and `group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyWire {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_groups: Option<Vec<String>>,
}

impl From<AccessPolicy> for PolicyWire {
    fn from(policy: AccessPolicy) -> Self {
        policy.to_wire()
    }
}

impl TryFrom<PolicyWire> for AccessPolicy {
    type Error = PolicyError;

    fn try_from(wire: PolicyWire) -> Result<Self, Self::Error> {
        AccessPolicy::from_wire(wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(ids: &[&str]) -> GroupSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(AccessPolicyType::parse("PUBLIC"), Ok(AccessPolicyType::Public));
        assert_eq!(AccessPolicyType::parse("Group"), Ok(AccessPolicyType::Group));
        assert_eq!(AccessPolicyType::parse("private"), Ok(AccessPolicyType::Private));
    }

    #[test]
    fn policy_type_deserializes_case_insensitively() {
        let kind: AccessPolicyType = serde_json::from_value(serde_json::json!("GROUP")).unwrap();
        assert_eq!(kind, AccessPolicyType::Group);
        assert_eq!(serde_json::to_value(kind).unwrap(), serde_json::json!("group"));
        assert!(serde_json::from_value::<AccessPolicyType>(serde_json::json!("friends")).is_err());
    }

    #[test]
    fn unknown_type_is_invalid() {
        let wire = PolicyWire {
            kind: "friends".into(),
            allowed_groups: None,
        };
        assert_eq!(
            AccessPolicy::from_wire(wire),
            Err(PolicyError::UnknownType("friends".into()))
        );
    }

    #[test]
    fn private_wire_form_has_no_groups() {
        let wire = AccessPolicy::Private.to_wire();
        assert_eq!(wire.kind, "private");
        assert!(wire.allowed_groups.is_none());

        let json = serde_json::to_value(&AccessPolicy::Private).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "private" }));
    }

    #[test]
    fn private_wire_value_with_groups_drops_them() {
        let wire = PolicyWire {
            kind: "private".into(),
            allowed_groups: Some(vec!["g1".into()]),
        };
        assert_eq!(AccessPolicy::from_wire(wire), Ok(AccessPolicy::Private));
    }

    #[test]
    fn public_without_groups_parses_with_empty_set() {
        let policy: AccessPolicy =
            serde_json::from_value(serde_json::json!({ "type": "public" })).unwrap();
        assert_eq!(policy, AccessPolicy::public());
    }

    #[test]
    fn group_without_groups_is_rejected() {
        let result: Result<AccessPolicy, _> =
            serde_json::from_value(serde_json::json!({ "type": "group", "allowed_groups": [] }));
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_groups_collapse_on_parse() {
        let wire = PolicyWire {
            kind: "group".into(),
            allowed_groups: Some(vec!["g1".into(), "g2".into(), "g1".into()]),
        };
        let policy = AccessPolicy::from_wire(wire).unwrap();
        assert_eq!(policy.allowed_groups().unwrap().as_slice(), ["g1", "g2"]);
    }

    #[test]
    fn wire_round_trip_for_every_variant() {
        let cases = [
            AccessPolicy::Private,
            AccessPolicy::public(),
            AccessPolicy::Public {
                allowed_groups: groups(&["g1"]),
            },
            AccessPolicy::Group {
                allowed_groups: groups(&["g1"]),
            },
            AccessPolicy::Group {
                allowed_groups: groups(&["g1", "g2", "g3"]),
            },
        ];

        for policy in cases {
            assert_eq!(AccessPolicy::from_wire(policy.to_wire()), Ok(policy));
        }
    }

    #[test]
    fn group_set_keeps_insertion_order() {
        let mut set = GroupSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert_eq!(set.as_slice(), ["b", "a"]);
    }
}
