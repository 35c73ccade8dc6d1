use std::path::PathBuf;
use std::sync::Arc;

use diesel::SqliteConnection;

use crate::config::{Config, prepare_upload_dir};
use crate::db::DbPool;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    /// Absolute upload directory, created at startup.
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> std::io::Result<Self> {
        let upload_dir = prepare_upload_dir(&config.upload_dir)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
            upload_dir,
        })
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    pub async fn with_conn<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?
    }
}
