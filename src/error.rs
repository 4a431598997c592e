use thiserror::Error;

use crate::policy::PolicyError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid access policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("user {user_id} is not a member of group {group_id}")]
    NotGroupMember { group_id: String, user_id: String },

    #[error("user {user_id} does not own note {note_id}")]
    NotNoteOwner { note_id: String, user_id: String },

    #[error("access to note {note_id} denied")]
    AccessDenied { note_id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("a group with exactly these members already exists")]
    DuplicateGroup,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
