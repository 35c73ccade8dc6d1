use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use auth_check::{HashParams, TokenConfig, TokenError, hash_params};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me-0123456789abcdef";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("JWT_SECRET is not usable: {0}")]
    Token(#[from] TokenError),
    #[error("SCRYPT_LOG_N is not usable: {0}")]
    HashParams(#[from] auth_check::PasswordError),
}

/// Runtime settings, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub token: TokenConfig,
    pub admin_username: String,
    pub admin_password: String,
    pub admin_password_hash: Option<String>,
    pub hash_params: HashParams,
    pub preview_max_rows: i64,
    pub max_upload_bytes: usize,
    /// True when JWT_SECRET was not set and the development key is in use.
    pub dev_secret: bool,
}

impl Config {
    /// Reads the process environment only; no `.env` file is loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Unset and empty values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secret = var("JWT_SECRET");
        let dev_secret = secret.is_none();
        let ttl_minutes: u64 = parse_or(&var, "ACCESS_TOKEN_EXPIRE_MINUTES", 120)?;
        let token = TokenConfig::new(
            secret.unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            var("JWT_ISSUER").unwrap_or_else(|| "csv-dashboard".to_string()),
            var("JWT_AUDIENCE").unwrap_or_else(|| "csv-dashboard".to_string()),
            Duration::from_secs(ttl_minutes.saturating_mul(60)),
        )?;

        let log_n: u8 = parse_or(&var, "SCRYPT_LOG_N", 15)?;

        Ok(Config {
            port: parse_or(&var, "PORT", 8000)?,
            database_url: var("DATABASE_URL").unwrap_or_else(|| "csvdash.sqlite3".to_string()),
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            token,
            admin_username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: var("ADMIN_PASSWORD").unwrap_or_else(|| "admin123".to_string()),
            admin_password_hash: var("ADMIN_PASSWORD_HASH"),
            hash_params: hash_params(log_n)?,
            preview_max_rows: parse_or(&var, "PREVIEW_MAX_ROWS", csv_preview::DEFAULT_MAX_ROWS)?,
            max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            dev_secret,
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Creates the upload directory if needed and returns its absolute path.
pub fn prepare_upload_dir(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    dir.canonicalize()
}
