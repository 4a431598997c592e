use notedeck::policy::{AccessPolicy, AccessPolicyType, GroupSet, PolicyError, PolicyWire};
use notedeck::transition::{apply_edited_policy, escalate_to_group};
use speculate2::speculate;

fn groups(ids: &[&str]) -> GroupSet {
    ids.iter().copied().collect()
}

fn group(ids: &[&str]) -> AccessPolicy {
    AccessPolicy::Group {
        allowed_groups: groups(ids),
    }
}

fn public(ids: &[&str]) -> AccessPolicy {
    AccessPolicy::Public {
        allowed_groups: groups(ids),
    }
}

fn all_shapes() -> Vec<AccessPolicy> {
    vec![
        AccessPolicy::Private,
        public(&[]),
        public(&["g1"]),
        group(&["g1"]),
        group(&["g1", "g2"]),
    ]
}

speculate! {
    describe "escalate_to_group" {
        it "is idempotent" {
            for policy in all_shapes() {
                let once = escalate_to_group(&policy, "g9");
                let twice = escalate_to_group(&once, "g9");
                assert_eq!(once, twice);
            }
        }

        it "never shrinks the allowed groups" {
            for policy in all_shapes() {
                let before = policy.allowed_groups().cloned().unwrap_or_default();
                let after = escalate_to_group(&policy, "g9");
                let after_groups = after.allowed_groups().expect("escalated policy has groups");
                assert!(before.is_subset(after_groups));
                assert!(after_groups.contains("g9"));
            }
        }

        it "never produces a private policy" {
            for policy in all_shapes() {
                assert_ne!(escalate_to_group(&policy, "g9").kind(), AccessPolicyType::Private);
            }
        }

        it "keeps a public note public" {
            assert_eq!(escalate_to_group(&public(&[]), "g1"), public(&["g1"]));
        }

        it "turns a private note into a single-group note" {
            assert_eq!(escalate_to_group(&AccessPolicy::Private, "g1"), group(&["g1"]));
        }

        it "does not duplicate a group already recorded" {
            assert_eq!(escalate_to_group(&group(&["g1", "g2"]), "g1"), group(&["g1", "g2"]));
        }
    }

    describe "apply_edited_policy" {
        it "keeps a group note as is when private is requested" {
            let existing = group(&["g1", "g2"]);
            assert_eq!(
                apply_edited_policy(&existing, AccessPolicyType::Private, None),
                Ok(existing.clone())
            );
        }

        it "downgrades a shared public note to its groups" {
            assert_eq!(
                apply_edited_policy(&public(&["g1"]), AccessPolicyType::Private, None),
                Ok(group(&["g1"]))
            );
        }

        it "allows a never-shared public note to become private" {
            assert_eq!(
                apply_edited_policy(&public(&[]), AccessPolicyType::Private, None),
                Ok(AccessPolicy::Private)
            );
        }

        it "ignores groups passed along with a private request" {
            assert_eq!(
                apply_edited_policy(&AccessPolicy::Private, AccessPolicyType::Private, Some(groups(&["g1"]))),
                Ok(AccessPolicy::Private)
            );
        }

        it "uses the requested groups for a group request" {
            assert_eq!(
                apply_edited_policy(&AccessPolicy::Private, AccessPolicyType::Group, Some(groups(&["g3"]))),
                Ok(group(&["g3"]))
            );
        }

        it "rejects a group request with no groups" {
            assert_eq!(
                apply_edited_policy(&public(&[]), AccessPolicyType::Group, None),
                Err(PolicyError::EmptyGroupSet)
            );
        }

        it "never hides a shared note from its groups" {
            for existing in all_shapes() {
                let Some(before) = existing.allowed_groups().filter(|g| !g.is_empty()).cloned() else {
                    continue;
                };
                let edited = apply_edited_policy(&existing, AccessPolicyType::Private, None)
                    .expect("private edit is always valid");
                assert_ne!(edited, AccessPolicy::Private);
                assert!(before.is_subset(edited.allowed_groups().expect("groups kept")));
            }
        }
    }

    describe "wire form" {
        it "round-trips every shape through JSON" {
            for policy in all_shapes() {
                let json = serde_json::to_value(&policy).expect("serialize");
                let back: AccessPolicy = serde_json::from_value(json).expect("deserialize");
                assert_eq!(back, policy);
            }
        }

        it "parses mixed-case type names" {
            let wire = PolicyWire {
                kind: "Group".into(),
                allowed_groups: Some(vec!["g1".into()]),
            };
            assert_eq!(AccessPolicy::from_wire(wire), Ok(group(&["g1"])));
        }

        it "rejects unknown type names" {
            let result: Result<AccessPolicy, _> =
                serde_json::from_value(serde_json::json!({ "type": "friends" }));
            assert!(result.is_err());
        }
    }
}
