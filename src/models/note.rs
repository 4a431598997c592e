use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{AccessPolicy, AccessPolicyType};

/// A user-authored note filed under a subject.
///
/// Visibility is governed entirely by `access_policy`; see
/// [`crate::admission`]. Ratings and comments are append-only lists stored
/// inline with the note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    /// The author. Only the owner may edit, delete, or change the policy.
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub subject_id: String,
    pub title: String,
    pub content: String,
    /// Category tags, optionally namespaced as `category:name`.
    #[serde(rename = "tag", default)]
    pub tags: Vec<String>,
    #[serde(rename = "theme", default)]
    pub themes: Vec<String>,
    pub date: DateTime<Utc>,
    pub access_policy: AccessPolicy,
    #[serde(default)]
    pub note_ratings: Vec<NoteRating>,
    #[serde(default)]
    pub note_comments: Vec<NoteComment>,
    #[serde(default)]
    pub view_counter: u64,
}

impl Note {
    /// Mean of all ratings, `0.0` when unrated.
    pub fn average_rating(&self) -> f64 {
        if self.note_ratings.is_empty() {
            return 0.0;
        }
        let total: u32 = self.note_ratings.iter().map(|r| u32::from(r.rating)).sum();
        f64::from(total) / self.note_ratings.len() as f64
    }

    pub fn has_user_rated(&self, user_id: &str) -> bool {
        self.note_ratings.iter().any(|r| r.rated_by_uid == user_id)
    }

    /// Tag names with any `category:` prefix stripped.
    ///
    /// The name is the segment after the first colon, so `a:b:c` yields `b`.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(|t| t.split(':').nth(1).unwrap_or(t.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteRating {
    /// 1 to 5.
    pub rating: u8,
    pub rated_by_uid: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteComment {
    pub comment: String,
    pub comment_by_uid: String,
    pub date: DateTime<Utc>,
}

/// Input for creating a note. The owner is the acting user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteInput {
    pub subject_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    pub access_policy: AccessPolicyType,
    /// Only meaningful for `public` and `group`.
    #[serde(default)]
    pub allowed_groups: Option<Vec<String>>,
}

/// Input for editing a note. All fields are optional for partial updates.
///
/// When `access_policy` is set, the stored policy is recomputed with
/// [`crate::transition::apply_edited_policy`]; `allowed_groups` defaults to
/// the groups already recorded on the note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteInput {
    pub subject_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub themes: Option<Vec<String>>,
    pub access_policy: Option<AccessPolicyType>,
    pub allowed_groups: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateNoteInput {
    pub rating: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentNoteInput {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareNoteInput {
    pub group_id: String,
}

/// Search and filter applied to a subject's public notes.
///
/// Every criterion left empty matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteFilter {
    /// Case-insensitive substring of the title.
    #[serde(default)]
    pub search: Option<String>,
    /// Matches if the note carries any of these tag names.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Matches if the note carries any of these themes. Blank entries are ignored.
    #[serde(default)]
    pub themes: Vec<String>,
}

impl NoteFilter {
    pub fn matches(&self, note: &Note) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => note.title.to_lowercase().contains(&term.to_lowercase()),
        };

        let matches_tags = self.tags.is_empty()
            || note
                .tag_names()
                .any(|name| self.tags.iter().any(|t| t == name));

        let mut themes = self.themes.iter().filter(|t| !t.trim().is_empty()).peekable();
        let matches_themes =
            themes.peek().is_none() || themes.any(|theme| note.themes.contains(theme));

        matches_search && matches_tags && matches_themes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(title: &str, tags: &[&str], themes: &[&str]) -> Note {
        Note {
            id: "n1".into(),
            owner_id: "u1".into(),
            subject_id: "s1".into(),
            title: title.into(),
            content: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            themes: themes.iter().map(|t| t.to_string()).collect(),
            date: Utc::now(),
            access_policy: AccessPolicy::public(),
            note_ratings: vec![],
            note_comments: vec![],
            view_counter: 0,
        }
    }

    fn rating(by: &str, rating: u8) -> NoteRating {
        NoteRating {
            rating,
            rated_by_uid: by.into(),
            date: Utc::now(),
        }
    }

    #[test]
    fn average_rating_of_unrated_note_is_zero() {
        assert_eq!(note("a", &[], &[]).average_rating(), 0.0);
    }

    #[test]
    fn average_rating_is_the_mean() {
        let mut n = note("a", &[], &[]);
        n.note_ratings = vec![rating("u2", 4), rating("u3", 5)];
        assert_eq!(n.average_rating(), 4.5);
        assert!(n.has_user_rated("u3"));
        assert!(!n.has_user_rated("u4"));
    }

    #[test]
    fn filter_strips_tag_categories() {
        let n = note("Linear algebra", &["topic:matrices"], &[]);
        let filter = NoteFilter {
            tags: vec!["matrices".into()],
            ..Default::default()
        };
        assert!(filter.matches(&n));
    }

    #[test]
    fn tag_name_is_the_second_segment() {
        let n = note("x", &["course:graphs:extra", "plain"], &[]);
        let names: Vec<&str> = n.tag_names().collect();
        assert_eq!(names, vec!["graphs", "plain"]);
    }

    #[test]
    fn filter_search_is_case_insensitive() {
        let n = note("Linear Algebra", &[], &[]);
        let filter = NoteFilter {
            search: Some("ALGEBRA".into()),
            ..Default::default()
        };
        assert!(filter.matches(&n));
    }

    #[test]
    fn blank_themes_match_everything() {
        let n = note("x", &[], &["exam"]);
        let filter = NoteFilter {
            themes: vec!["".into(), "  ".into()],
            ..Default::default()
        };
        assert!(filter.matches(&n));

        let filter = NoteFilter {
            themes: vec!["lecture".into()],
            ..Default::default()
        };
        assert!(!filter.matches(&n));
    }

    #[test]
    fn stored_document_uses_original_field_names() {
        let json = serde_json::to_value(note("x", &["a"], &["b"])).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["tag"], serde_json::json!(["a"]));
        assert_eq!(json["access_policy"]["type"], "public");
    }
}
