use std::fmt;
use std::time::{Duration, SystemTime};

use josekit::JoseError;
use josekit::{jws::{JwsHeader, HS256}, jwt::{self, JwtPayload}, Value};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shortest signing key accepted for HS256.
pub const MIN_KEY_LEN: usize = 32;

const ADMIN_CLAIM: &str = "is_admin";

/// Identity carried by a verified access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing key must be at least {MIN_KEY_LEN} bytes")]
    WeakKey,
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Jose(#[from] JoseError),
}

/// Settings shared by token issuance and verification.
#[derive(Clone)]
pub struct TokenConfig {
    signing_key: Vec<u8>,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl TokenConfig {
    pub fn new(
        signing_key: impl Into<Vec<u8>>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, TokenError> {
        let signing_key = signing_key.into();
        if signing_key.len() < MIN_KEY_LEN {
            return Err(TokenError::WeakKey);
        }
        Ok(Self {
            signing_key,
            issuer: issuer.into(),
            audience: audience.into(),
            ttl,
        })
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("signing_key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Issues a signed HS256 access token for `user`.
pub fn generate_token(config: &TokenConfig, user: &UserInfo) -> Result<String, TokenError> {
    let now = SystemTime::now();
    let expires_at = now
        .checked_add(config.ttl)
        .ok_or(TokenError::Invalid("token lifetime out of range"))?;

    let mut header = JwsHeader::new();
    header.set_token_type("JWT");

    let mut payload = JwtPayload::new();
    payload.set_issuer(config.issuer.as_str());
    payload.set_audience(vec![config.audience.as_str()]);
    payload.set_subject(user.username.as_str());
    payload.set_issued_at(&now);
    payload.set_not_before(&now);
    payload.set_expires_at(&expires_at);
    payload.set_claim(ADMIN_CLAIM, Some(Value::Bool(user.is_admin)))?;

    let signer = HS256.signer_from_bytes(&config.signing_key)?;
    Ok(jwt::encode_with_signer(&payload, &header, &signer)?)
}

/// Checks the signature and registered claims of `token`.
pub fn verify_token(config: &TokenConfig, token: &str) -> Result<UserInfo, TokenError> {
    let verifier = HS256.verifier_from_bytes(&config.signing_key)?;
    let (payload, _) = jwt::decode_with_verifier(token, &verifier)?;
    let now = SystemTime::now();

    match payload.expires_at() {
        Some(expires_at) if expires_at > now => {}
        _ => return Err(TokenError::Expired),
    }

    if payload.issuer() != Some(config.issuer.as_str()) {
        return Err(TokenError::Invalid("issuer"));
    }

    if !payload
        .audience()
        .is_some_and(|audience| audience.contains(&config.audience.as_str()))
    {
        return Err(TokenError::Invalid("audience"));
    }

    if payload.issued_at().is_none_or(|issued_at| issued_at > now) {
        return Err(TokenError::Invalid("issued at"));
    }

    if payload.not_before().is_none_or(|not_before| not_before > now) {
        return Err(TokenError::Invalid("not before"));
    }

    let username = payload
        .subject()
        .filter(|subject| !subject.is_empty())
        .ok_or(TokenError::Invalid("subject"))?;

    let is_admin = payload
        .claim(ADMIN_CLAIM)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(UserInfo {
        username: username.to_string(),
        is_admin,
    })
}
