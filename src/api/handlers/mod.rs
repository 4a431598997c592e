use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::middleware::{SignedIn, Viewer};
use crate::error::Error;
use crate::models::*;
use crate::services::Services;
use crate::transition::ShareOutcome;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Maps a domain error to a status and message.
///
/// Client errors are returned with their message; store failures are logged
/// and answered with a generic body so backend details do not leak.
fn api_error(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::InvalidPolicy(_) | Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotGroupMember { .. } | Error::NotNoteOwner { .. } | Error::AccessDenied { .. } => {
            StatusCode::FORBIDDEN
        }
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::DuplicateGroup | Error::AlreadyExists { .. } => StatusCode::CONFLICT,
        Error::Store(_) => {
            tracing::error!("Internal error: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    tracing::warn!("Request rejected ({}): {}", status, e);
    (status, e.to_string())
}

/// Unwraps a JSON body, answering malformed input with 400.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(input)| input).map_err(|rejection| {
        tracing::warn!("Malformed request body: {}", rejection.body_text());
        (StatusCode::BAD_REQUEST, rejection.body_text())
    })
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Users
// ============================================================

pub async fn register_user(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    payload: Result<Json<RegisterUserInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let input = body(payload)?;
    services
        .users
        .register(&user_id, input)
        .await
        .map(|u| (StatusCode::CREATED, Json(u)))
        .map_err(api_error)
}

pub async fn list_users(State(services): State<Services>) -> ApiResult<Json<Vec<BasicUserInfo>>> {
    let users = services.users.list_users().await.map_err(api_error)?;
    Ok(Json(users.into_iter().map(BasicUserInfo::from).collect()))
}

pub async fn get_user(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> ApiResult<Json<BasicUserInfo>> {
    services
        .users
        .get_user(&id)
        .await
        .map(|u| Json(u.into()))
        .map_err(api_error)
}

/// Notes by a user that the caller may see.
pub async fn list_user_notes(
    State(services): State<Services>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Note>>> {
    services
        .notes
        .visible_notes_by_owner(&id, viewer.as_deref())
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Favorites
// ============================================================

#[derive(Debug, Default, Deserialize)]
pub struct FavoritesQuery {
    /// Return the favorited notes instead of the bookmark entries.
    #[serde(default)]
    pub notes: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FavoritesResponse {
    Favorites(Vec<Favorite>),
    Notes(Vec<Note>),
}

pub async fn list_favorites(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Query(query): Query<FavoritesQuery>,
) -> ApiResult<Json<FavoritesResponse>> {
    let response = if query.notes {
        FavoritesResponse::Notes(services.users.favorite_notes(&user_id).await.map_err(api_error)?)
    } else {
        FavoritesResponse::Favorites(services.users.favorites(&user_id).await.map_err(api_error)?)
    };
    Ok(Json(response))
}

pub async fn add_favorite(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(note_id): Path<String>,
) -> ApiResult<(StatusCode, Json<Favorite>)> {
    services
        .users
        .add_favorite(&user_id, &note_id)
        .await
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(api_error)
}

pub async fn remove_favorite(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(note_id): Path<String>,
) -> ApiResult<StatusCode> {
    if services
        .users
        .remove_favorite(&user_id, &note_id)
        .await
        .map_err(api_error)?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Favorite not found".to_string()))
    }
}

// ============================================================
// Subjects
// ============================================================

pub async fn create_subject(
    State(services): State<Services>,
    SignedIn(_): SignedIn,
    payload: Result<Json<CreateSubjectInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Subject>)> {
    let input = body(payload)?;
    services
        .subjects
        .create_subject(input)
        .await
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(api_error)
}

pub async fn list_subjects(State(services): State<Services>) -> ApiResult<Json<Vec<Subject>>> {
    services
        .subjects
        .list_subjects()
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn get_subject(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> ApiResult<Json<Subject>> {
    services
        .subjects
        .get_subject(&id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Query string for a subject's note list. `tags` and `themes` are
/// comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct SubjectNotesQuery {
    pub q: Option<String>,
    pub tags: Option<String>,
    pub themes: Option<String>,
}

impl SubjectNotesQuery {
    fn into_filter(self) -> NoteFilter {
        fn split(list: Option<String>) -> Vec<String> {
            list.map(|l| {
                l.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
        }

        NoteFilter {
            search: self.q,
            tags: split(self.tags),
            themes: split(self.themes),
        }
    }
}

pub async fn list_subject_notes(
    State(services): State<Services>,
    Path(id): Path<String>,
    Query(query): Query<SubjectNotesQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    services.subjects.get_subject(&id).await.map_err(api_error)?;
    services
        .notes
        .public_notes_by_subject(&id, &query.into_filter())
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Categories
// ============================================================

pub async fn create_category(
    State(services): State<Services>,
    SignedIn(_): SignedIn,
    payload: Result<Json<CreateCategoryInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let input = body(payload)?;
    services
        .categories
        .create_category(input)
        .await
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(api_error)
}

pub async fn list_categories(State(services): State<Services>) -> ApiResult<Json<Vec<Category>>> {
    services
        .categories
        .list_categories()
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn get_category(
    State(services): State<Services>,
    Path(id): Path<String>,
) -> ApiResult<Json<Category>> {
    services
        .categories
        .get_category(&id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn update_category(
    State(services): State<Services>,
    SignedIn(_): SignedIn,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCategoryInput>, JsonRejection>,
) -> ApiResult<Json<Category>> {
    let input = body(payload)?;
    services
        .categories
        .update_category(&id, input)
        .await
        .map(Json)
        .map_err(api_error)
}

// ============================================================
// Notes
// ============================================================

pub async fn create_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    payload: Result<Json<CreateNoteInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let input = body(payload)?;
    services
        .notes
        .create_note(&user_id, input)
        .await
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(api_error)
}

#[derive(Debug, Deserialize)]
pub struct MostViewedQuery {
    #[serde(default = "default_most_viewed_limit")]
    pub limit: usize,
}

fn default_most_viewed_limit() -> usize {
    10
}

pub async fn most_viewed_notes(
    State(services): State<Services>,
    Query(query): Query<MostViewedQuery>,
) -> ApiResult<Json<Vec<Note>>> {
    services
        .notes
        .most_viewed_public(query.limit)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn view_note(
    State(services): State<Services>,
    Viewer(viewer): Viewer,
    Path(id): Path<String>,
) -> ApiResult<Json<Note>> {
    services
        .notes
        .view_note(&id, viewer.as_deref())
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn update_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteInput>, JsonRejection>,
) -> ApiResult<Json<Note>> {
    let input = body(payload)?;
    services
        .notes
        .update_note(&id, &user_id, input)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn delete_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    services
        .notes
        .delete_note(&id, &user_id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

pub async fn rate_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
    payload: Result<Json<RateNoteInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let input = body(payload)?;
    services
        .notes
        .rate_note(&id, &user_id, input.rating)
        .await
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(api_error)
}

pub async fn comment_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
    payload: Result<Json<CommentNoteInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let input = body(payload)?;
    services
        .notes
        .comment_on_note(&id, &user_id, &input.comment)
        .await
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(api_error)
}

pub async fn share_note(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
    payload: Result<Json<ShareNoteInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ShareOutcome>)> {
    let input = body(payload)?;
    services
        .notes
        .share_note(&id, &input.group_id, &user_id)
        .await
        .map(|outcome| (StatusCode::CREATED, Json(outcome)))
        .map_err(api_error)
}

// ============================================================
// Groups
// ============================================================

pub async fn create_group(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    payload: Result<Json<CreateGroupInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let input = body(payload)?;
    services
        .groups
        .create_group(&user_id, input)
        .await
        .map(|g| (StatusCode::CREATED, Json(g)))
        .map_err(api_error)
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupListQuery {
    #[serde(default)]
    pub sort: GroupSortOption,
}

pub async fn list_groups(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Query(query): Query<GroupListQuery>,
) -> ApiResult<Json<Vec<Group>>> {
    services
        .groups
        .sorted_user_groups(&user_id, query.sort)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn get_group(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
) -> ApiResult<Json<Group>> {
    services
        .groups
        .get_group_for(&id, &user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn list_group_notes(
    State(services): State<Services>,
    SignedIn(user_id): SignedIn,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Note>>> {
    services
        .groups
        .group_notes(&id, &user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn store_errors_are_sanitized() {
        let (status, message) = api_error(Error::Store(StoreError::Backend(
            "disk I/O error at /var/lib/notedeck".into(),
        )));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let (status, message) = api_error(Error::AccessDenied {
            note_id: "n1".into(),
        });
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(message.contains("n1"));

        assert_eq!(api_error(Error::DuplicateGroup).0, StatusCode::CONFLICT);
        assert_eq!(
            api_error(Error::not_found("note", "n2")).0,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn subject_query_splits_lists() {
        let filter = SubjectNotesQuery {
            q: Some("graph".into()),
            tags: Some("exam, summary,".into()),
            themes: None,
        }
        .into_filter();
        assert_eq!(filter.tags, vec!["exam".to_string(), "summary".to_string()]);
        assert!(filter.themes.is_empty());
        assert_eq!(filter.search.as_deref(), Some("graph"));
    }
}
