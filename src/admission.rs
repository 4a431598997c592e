//! View-time admission check.

use crate::membership::MembershipOracle;
use crate::models::Note;
use crate::policy::AccessPolicy;
use crate::store::StoreError;

/// Decides whether a viewer may see a note.
///
/// | Policy | Admitted |
/// |---|---|
/// | Private | the owner |
/// | Public | everyone, including anonymous viewers |
/// | Group | the owner and members of any allowed group |
#[derive(Clone)]
pub struct AdmissionCheck {
    oracle: MembershipOracle,
}

impl AdmissionCheck {
    pub fn new(oracle: MembershipOracle) -> Self {
        Self { oracle }
    }

    pub async fn admit(&self, note: &Note, viewer: Option<&str>) -> Result<bool, StoreError> {
        let admitted = match (&note.access_policy, viewer) {
            (AccessPolicy::Public { .. }, _) => true,
            (_, None) => false,
            (AccessPolicy::Private, Some(viewer)) => viewer == note.owner_id,
            (AccessPolicy::Group { allowed_groups }, Some(viewer)) => {
                viewer == note.owner_id
                    || self
                        .oracle
                        .is_member_of_any(allowed_groups.iter(), viewer)
                        .await?
            }
        };

        tracing::debug!(
            "Admission for note {} ({}) viewer {:?}: {}",
            note.id,
            note.access_policy.kind().as_str(),
            viewer,
            admitted
        );
        Ok(admitted)
    }
}
