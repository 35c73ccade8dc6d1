use scrypt::{
    Params, Scrypt,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Hashes `password` into a PHC string with a fresh random salt.
///
/// Slow by construction. Callers in async code should run it on a blocking thread.
pub fn hash_password(password: &str, params: Params) -> Result<String, PasswordError> {
    let salt = SaltString::generate(OsRng);
    Scrypt
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError(err.to_string()))
}

/// Scrypt cost parameters with the given CPU/memory cost (log2 of N).
pub fn hash_params(log_n: u8) -> Result<Params, PasswordError> {
    Params::new(log_n, Params::RECOMMENDED_R, Params::RECOMMENDED_P, Params::RECOMMENDED_LEN)
        .map_err(|err| PasswordError(err.to_string()))
}

/// Checks if the provided password matches the hashed password.
///
/// A hash that cannot be parsed never matches.
pub fn password_equals(hash: &str, password: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!("Stored password hash is malformed: {}", err);
            return false;
        }
    };
    Scrypt.verify_password(password.as_bytes(), &parsed_hash).is_ok()
}
