use diesel::SqliteConnection;
use thiserror::Error;

use crate::config::Config;
use crate::db::{User, users};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
    #[error(transparent)]
    Password(#[from] auth_check::PasswordError),
}

/// Makes sure the configured admin account exists and has the admin flag.
///
/// Creates the user when missing and promotes an existing non-admin with
/// the same name. An existing account keeps its password.
pub fn ensure_admin(conn: &mut SqliteConnection, config: &Config) -> Result<User, SeedError> {
    if let Some(user) = users::find_by_username(conn, &config.admin_username)? {
        if user.is_admin {
            tracing::debug!("Admin {} already present", user.username);
            return Ok(user);
        }
        tracing::info!("Promoting existing user {} to admin", user.username);
        return Ok(users::set_admin(conn, user.id, true)?);
    }

    let password_hash = match &config.admin_password_hash {
        Some(hash) => hash.clone(),
        None => auth_check::hash_password(&config.admin_password, config.hash_params.clone())?,
    };
    let user = users::create(conn, &config.admin_username, &password_hash, true)?;
    tracing::info!("Created admin user {}", user.username);
    Ok(user)
}
