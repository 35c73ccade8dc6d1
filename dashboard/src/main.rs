use csv_dashboard::{AppState, Config, StartupError, db, router, seed};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .pretty()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.dev_secret {
        tracing::warn!("JWT_SECRET is not set, using the development signing key");
    }

    let pool = db::connect_and_migrate(&config.database_url)?;
    {
        let pool = pool.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StartupError> {
            let mut conn = pool.get().map_err(db::DbError::from)?;
            seed::ensure_admin(&mut conn, &config)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)??;
    }

    let port = config.port;
    let state = AppState::new(pool, config)?;
    tracing::info!("Storing uploads in {}", state.upload_dir.display());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
