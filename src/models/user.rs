use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile data kept alongside the auth provider's identity.
///
/// The document id is the auth provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

/// The public part of a profile, served to any caller.
///
/// Favorites stay private to their owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasicUserInfo {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub is_admin: bool,
}

impl From<UserProfile> for BasicUserInfo {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            username: profile.username,
            is_admin: profile.is_admin,
        }
    }
}

/// A user's bookmark of a note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub note_id: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserInput {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}
