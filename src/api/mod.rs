mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::services::Services;

pub fn create_router(services: Services, security: SecurityConfig) -> Router {
    let api = Router::new()
        // Users
        .route("/users", get(handlers::list_users).post(handlers::register_user))
        .route("/users/{id}", get(handlers::get_user))
        .route("/users/{id}/notes", get(handlers::list_user_notes))
        // Favorites of the signed-in user
        .route("/favorites", get(handlers::list_favorites))
        .route(
            "/favorites/{note_id}",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        // Subjects
        .route("/subjects", get(handlers::list_subjects).post(handlers::create_subject))
        .route("/subjects/{id}", get(handlers::get_subject))
        .route("/subjects/{id}/notes", get(handlers::list_subject_notes))
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/{id}",
            get(handlers::get_category).put(handlers::update_category),
        )
        // Notes
        .route("/notes", post(handlers::create_note))
        .route("/notes/most-viewed", get(handlers::most_viewed_notes))
        .route(
            "/notes/{id}",
            get(handlers::view_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/notes/{id}/ratings", post(handlers::rate_note))
        .route("/notes/{id}/comments", post(handlers::comment_note))
        .route("/notes/{id}/share", post(handlers::share_note))
        // Groups
        .route("/groups", get(handlers::list_groups).post(handlers::create_group))
        .route("/groups/{id}", get(handlers::get_group))
        .route("/groups/{id}/notes", get(handlers::list_group_notes))
        .route_layer(axum::middleware::from_fn_with_state(
            security.clone(),
            middleware::auth_middleware,
        ))
        // Health stays reachable without the API key
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&security))
        .with_state(services)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let Some(origins) = &security.cors_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
