mod password;
mod token;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub use password::{PasswordError, hash_params, hash_password, password_equals};
pub use scrypt::Params as HashParams;
pub use token::{MIN_KEY_LEN, TokenConfig, TokenError, UserInfo, generate_token, verify_token};

/// Rejection produced by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingToken,
    InvalidToken,
}

impl AuthRejection {
    pub fn detail(&self) -> &'static str {
        match self {
            AuthRejection::MissingToken => "Not authenticated",
            AuthRejection::InvalidToken => "Invalid token",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
            Json(json!({ "detail": self.detail() })),
        )
            .into_response()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// axum middleware: verifies the bearer token locally and makes the caller's
// `UserInfo` available to handlers as a request extension
pub async fn auth_middleware(
    State(config): State<TokenConfig>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let Some(token) = bearer_token(req.headers()) else {
        tracing::debug!("No bearer token in request");
        return Err(AuthRejection::MissingToken);
    };

    let user_info = match verify_token(&config, token) {
        Ok(user_info) => user_info,
        Err(err) => {
            tracing::debug!("Token verification failed: {}", err);
            return Err(AuthRejection::InvalidToken);
        }
    };

    req.extensions_mut().insert(user_info);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
