use auth_check::UserInfo;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::db::{User, users};
use crate::error::ApiError;
use crate::state::AppState;

/// The account behind a verified token, re-read from the database.
///
/// Requires `auth_middleware` on the route. A token whose user has been
/// deleted is rejected with 401.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_info = parts
            .extensions
            .get::<UserInfo>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let user = state
            .with_conn(move |conn| Ok(users::find_by_username(conn, &user_info.username)?))
            .await?;

        user.map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("User not found"))
    }
}

/// A [`CurrentUser`] whose account has the admin flag.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            tracing::debug!("Non-admin {} refused on {}", user.username, parts.uri.path());
            return Err(ApiError::Forbidden("Admin only".to_string()));
        }
        Ok(AdminUser(user))
    }
}
