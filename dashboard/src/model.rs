use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{StoredFile, User};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
    pub is_admin: bool,
}

impl TokenResponse {
    pub fn bearer(access_token: String, user: &User) -> Self {
        TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOut {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        UserOut {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
            created_at: user.created_at.and_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOut {
    pub id: i32,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<StoredFile> for FileOut {
    fn from(file: StoredFile) -> Self {
        FileOut {
            id: file.id,
            filename: file.filename,
            uploaded_at: file.uploaded_at.and_utc(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    pub replace: bool,
}
