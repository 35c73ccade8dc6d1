use auth_check::{UserInfo, generate_token, hash_password, password_equals};
use axum::{Json, extract::State};

use crate::db::{User, is_unique_violation, users};
use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::model::{Credentials, TokenResponse, UserOut};
use crate::state::AppState;

fn issue_token(state: &AppState, user: &User) -> Result<TokenResponse, ApiError> {
    let token = generate_token(
        &state.config.token,
        &UserInfo {
            username: user.username.clone(),
            is_admin: user.is_admin,
        },
    )?;
    Ok(TokenResponse::bearer(token, user))
}

/// Creates a regular (non-admin) account and logs it in.
pub async fn signup(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = credentials.username.trim().to_string();
    if username.is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let params = state.config.hash_params.clone();
    let password = credentials.password;
    let password_hash =
        tokio::task::spawn_blocking(move || hash_password(&password, params)).await??;

    let user = state
        .with_conn(move |conn| match users::create(conn, &username, &password_hash, false) {
            Ok(user) => Ok(user),
            Err(err) if is_unique_violation(&err) => {
                Err(ApiError::bad_request("Username already exists"))
            }
            Err(err) => Err(err.into()),
        })
        .await?;

    tracing::info!("New user {} signed up", user.username);
    Ok(Json(issue_token(&state, &user)?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
    let username = credentials.username.trim().to_string();
    let user = state
        .with_conn(move |conn| Ok(users::find_by_username(conn, &username)?))
        .await?;

    let Some(user) = user else {
        tracing::debug!("Login for unknown user");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let hash = user.password_hash.clone();
    let password = credentials.password;
    let valid = tokio::task::spawn_blocking(move || password_equals(&hash, &password)).await?;
    if !valid {
        tracing::debug!("Invalid password for user {}", user.username);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    tracing::debug!("User {} logged in", user.username);
    Ok(Json(issue_token(&state, &user)?))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserOut> {
    Json(user.into())
}
