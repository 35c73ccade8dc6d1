mod admin;
mod auth;
mod files;
mod health;

use auth_check::auth_middleware;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

// room for the multipart boundaries and part headers around the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/files", get(files::list_files))
        .route("/files/{id}", get(files::preview_file))
        .route("/files/{id}/download", get(files::download_file))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}", delete(admin::delete_user))
        .route("/admin/files", get(admin::list_files))
        .route("/admin/files/{id}", delete(admin::delete_file))
        .route(
            "/admin/upload",
            post(admin::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route_layer(from_fn_with_state(state.config.token.clone(), auth_middleware));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
